use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// One interleaved vertex record, exactly as it is laid out in the vertex-buffer file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    /// 3 + 2 + 3 floats
    pub const SIZE: usize = std::mem::size_of::<Self>();
}
