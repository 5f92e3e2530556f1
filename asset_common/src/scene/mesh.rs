use serde::{Deserialize, Serialize};

use crate::gpu::Vertex;

/// Raw, non-interleaved mesh attributes as the importer produced them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ImportedMesh {
    pub name: Option<String>,
    pub material_index: usize,
    pub positions: Vec<[f32; 3]>,
    /// First UV channel, `None` when the source has no texture coordinates.
    pub uvs: Option<Vec<[f32; 2]>>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub triangles: Vec<[u32; 3]>,
}

impl ImportedMesh {
    pub fn new(material_index: usize) -> Self {
        Self {
            material_index,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Interleaves the attributes. Missing UVs or normals become zeros.
    pub fn vertex(&self, index: usize) -> Vertex {
        let uv = self
            .uvs
            .as_ref()
            .and_then(|uvs| uvs.get(index).copied())
            .unwrap_or([0.0; 2]);
        let normal = self
            .normals
            .as_ref()
            .and_then(|normals| normals.get(index).copied())
            .unwrap_or([0.0; 3]);
        Vertex {
            position: self.positions[index],
            uv,
            normal,
        }
    }

    pub fn interleaved_vertices(&self) -> Vec<Vertex> {
        (0..self.vertex_count()).map(|i| self.vertex(i)).collect()
    }

    pub fn flat_indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Returns the first triangle corner that does not point at a vertex.
    pub fn find_out_of_range_index(&self) -> Option<u32> {
        let vertex_count = self.vertex_count();
        self.triangles
            .iter()
            .flatten()
            .copied()
            .find(|&index| index as usize >= vertex_count)
    }
}
