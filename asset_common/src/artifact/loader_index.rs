use std::fmt;

use super::{split_numbered_line, FormatError};

/// First line of the loader index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderHeader {
    pub vertex_buffer_bytes: u64,
    pub index_buffer_bytes: u64,
    pub mesh_count: u64,
}

impl fmt::Display for LoaderHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.vertex_buffer_bytes, self.index_buffer_bytes, self.mesh_count
        )
    }
}

/// One indirect-draw style record per mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawRecord {
    pub model_name: String,
    pub material_index: u64,
    pub index_count: u64,
    /// In vertices, not bytes.
    pub base_vertex: u64,
    /// In indices, not bytes.
    pub first_index: u64,
    pub base_instance: u64,
}

impl fmt::Display for DrawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.model_name,
            self.material_index,
            self.index_count,
            self.base_vertex,
            self.first_index,
            self.base_instance
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoaderIndex {
    pub header: LoaderHeader,
    pub draws: Vec<DrawRecord>,
}

impl LoaderIndex {
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

        let header = match lines.next() {
            Some((line_number, line)) => parse_header(line, line_number)?,
            None => return Err(FormatError::MissingHeader { line: 1 }),
        };

        let mut draws = Vec::new();
        for (line_number, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let (
                model_name,
                [material_index, index_count, base_vertex, first_index, base_instance],
            ) = split_numbered_line::<5>(line, line_number)?;
            draws.push(DrawRecord {
                model_name: model_name.to_string(),
                material_index,
                index_count,
                base_vertex,
                first_index,
                base_instance,
            });
        }

        if draws.len() as u64 != header.mesh_count {
            return Err(FormatError::EntryCount {
                expected: header.mesh_count,
                found: draws.len() as u64,
            });
        }

        Ok(Self { header, draws })
    }
}

fn parse_header(line: &str, line_number: usize) -> Result<LoaderHeader, FormatError> {
    let fields: Vec<_> = line.split_whitespace().collect();
    let [vertex_buffer_bytes, index_buffer_bytes, mesh_count] = fields[..] else {
        return Err(FormatError::FieldCount {
            line: line_number,
            expected: 3,
        });
    };
    let parse = |value: &str| {
        value.parse::<u64>().map_err(|_| FormatError::InvalidNumber {
            line: line_number,
            value: value.to_string(),
        })
    };
    Ok(LoaderHeader {
        vertex_buffer_bytes: parse(vertex_buffer_bytes)?,
        index_buffer_bytes: parse(index_buffer_bytes)?,
        mesh_count: parse(mesh_count)?,
    })
}
