use crate::gpu::Vertex;

use super::FormatError;

/// Reads a vertex-buffer file back into vertex records.
pub fn read_vertex_buffer(bytes: &[u8]) -> Result<Vec<Vertex>, FormatError> {
    if bytes.len() % Vertex::SIZE != 0 {
        return Err(FormatError::Misaligned {
            length: bytes.len(),
            stride: Vertex::SIZE,
        });
    }
    // The file contents are not guaranteed to be aligned in memory.
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

/// Reads an index-buffer file back into 32 bit indices.
pub fn read_index_buffer(bytes: &[u8]) -> Result<Vec<u32>, FormatError> {
    let stride = std::mem::size_of::<u32>();
    if bytes.len() % stride != 0 {
        return Err(FormatError::Misaligned {
            length: bytes.len(),
            stride,
        });
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_buffers_are_rejected() {
        assert_eq!(
            read_vertex_buffer(&[0u8; 33]),
            Err(FormatError::Misaligned {
                length: 33,
                stride: 32
            })
        );
        assert!(read_index_buffer(&[0u8; 6]).is_err());
        assert_eq!(read_index_buffer(&7u32.to_ne_bytes()), Ok(vec![7]));
    }
}
