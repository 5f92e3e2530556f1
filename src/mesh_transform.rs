use std::sync::Arc;

use asset_common::{gpu::Vertex, scene::ImportedMesh};

/// Interleaved vertices plus a triangle list indexing into them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

pub trait MeshOptimizer: Send + Sync {
    /// `indices` are guaranteed to be in range of `vertices`.
    fn optimize(&self, vertices: &[Vertex], indices: &[u32]) -> MeshData;
}

/// How scene meshes become output meshes.
///
/// The two modes generally produce different vertex counts for the same input,
/// a consumer has to know which one a run used.
#[derive(Clone)]
pub enum MeshTransform {
    /// One vertex per triangle corner, duplicates kept.
    PassThrough,
    Optimized(Arc<dyn MeshOptimizer>),
}

impl MeshTransform {
    pub fn new(use_mesh_optimizer: bool) -> Self {
        if use_mesh_optimizer {
            MeshTransform::Optimized(Arc::new(MeshoptOptimizer::default()))
        } else {
            MeshTransform::PassThrough
        }
    }

    /// The mesh must have been checked for out of range indices.
    pub fn apply(&self, mesh: &ImportedMesh) -> MeshData {
        match self {
            MeshTransform::PassThrough => pass_through(mesh),
            MeshTransform::Optimized(_) if mesh.triangles.is_empty() => MeshData::default(),
            MeshTransform::Optimized(optimizer) => {
                optimizer.optimize(&mesh.interleaved_vertices(), &mesh.flat_indices())
            }
        }
    }
}

impl std::fmt::Debug for MeshTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshTransform::PassThrough => f.write_str("PassThrough"),
            MeshTransform::Optimized(_) => f.write_str("Optimized"),
        }
    }
}

fn pass_through(mesh: &ImportedMesh) -> MeshData {
    let vertices: Vec<Vertex> = mesh
        .triangles
        .iter()
        .flatten()
        .map(|&index| mesh.vertex(index as usize))
        .collect();
    let indices = (0..vertices.len() as u32).collect();
    MeshData { vertices, indices }
}

/// Deduplicates vertices, then runs the vertex cache, overdraw and vertex fetch passes of `meshopt`.
pub struct MeshoptOptimizer {
    /// How much vertex cache efficiency the overdraw pass may give up, 1.05 means 5%.
    pub overdraw_threshold: f32,
}

impl Default for MeshoptOptimizer {
    fn default() -> Self {
        Self {
            overdraw_threshold: 1.05,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct Position([f32; 3]);

impl meshopt::DecodePosition for Position {
    fn decode_position(&self) -> [f32; 3] {
        self.0
    }
}

impl MeshOptimizer for MeshoptOptimizer {
    fn optimize(&self, vertices: &[Vertex], indices: &[u32]) -> MeshData {
        let (unique_count, remap) = meshopt::generate_vertex_remap(vertices, Some(indices));
        let indices = meshopt::remap_index_buffer(Some(indices), vertices.len(), &remap);
        let vertices = meshopt::remap_vertex_buffer(vertices, unique_count, &remap);

        // Each pass works on the layout the previous one produced.
        let mut indices = meshopt::optimize_vertex_cache(&indices, unique_count);
        let positions: Vec<Position> = vertices.iter().map(|v| Position(v.position)).collect();
        meshopt::optimize_overdraw_in_place_decoder(
            &mut indices,
            &positions,
            self.overdraw_threshold,
        );
        let vertices = meshopt::optimize_vertex_fetch(&mut indices, &vertices);

        MeshData { vertices, indices }
    }
}
