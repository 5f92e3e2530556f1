//! The scene data model handed over by a scene importer.
//!
//! Format agnostic. Once an importer filled it in, the converter never reads the
//! model file again.

mod material;
mod mesh;

pub use material::*;
pub use mesh::*;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ImportedScene {
    pub materials: Vec<ImportedMaterial>,
    pub meshes: Vec<ImportedMesh>,
}

impl ImportedScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first mesh (index, material index) that points past the material list.
    pub fn find_dangling_material_ref(&self) -> Option<(usize, usize)> {
        self.meshes
            .iter()
            .enumerate()
            .find(|(_, mesh)| mesh.material_index >= self.materials.len())
            .map(|(index, mesh)| (index, mesh.material_index))
    }
}
