mod gltf_importer;

pub use gltf_importer::*;

use std::path::Path;

use asset_common::scene::ImportedScene;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Bake node transforms into the geometry, otherwise every mesh is emitted once in local space.
    pub pre_transform_vertices: bool,
}

/// Turns a model file into materials and raw mesh attributes.
pub trait SceneImporter: Send + Sync {
    /// An error means the file is unusable, the caller skips it.
    fn import(&self, path: &Path, options: &ImportOptions) -> anyhow::Result<ImportedScene>;
}
