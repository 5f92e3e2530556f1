#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use asset_common::{
    gpu::Vertex,
    scene::{BlendMode, ImportedMaterial, ImportedMesh, ImportedScene, TextureSlot},
};
use mesh_masher::{
    asset_writer::WriteReport,
    config_loader::Config,
    importer::{ImportOptions, SceneImporter},
    manifest::Manifest,
    mesh_transform::{MeshData, MeshOptimizer, MeshTransform},
    pipeline::{Pipeline, RunSummary},
    texture::{DecodedImage, ImageDecoder, PixelFormat},
};
use parking_lot::Mutex;

/// Serves scenes from memory, keyed by file name. Unknown files fail to import.
#[derive(Default)]
pub struct MemoryImporter {
    pub scenes: BTreeMap<String, ImportedScene>,
}

impl MemoryImporter {
    pub fn with(mut self, file_name: &str, scene: ImportedScene) -> Self {
        self.scenes.insert(file_name.into(), scene);
        self
    }
}

impl SceneImporter for MemoryImporter {
    fn import(&self, path: &Path, _options: &ImportOptions) -> anyhow::Result<ImportedScene> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .context("no file name")?;
        self.scenes
            .get(file_name)
            .cloned()
            .with_context(|| format!("{:?} is not a known scene", path))
    }
}

/// Treats the file contents as the pixels and counts how often each file was decoded.
/// Contents starting with `corrupt` fail to decode.
#[derive(Default)]
pub struct CountingDecoder {
    pub decoded: Mutex<BTreeMap<String, usize>>,
}

impl CountingDecoder {
    pub fn count(&self, contents: &str) -> usize {
        self.decoded.lock().get(contents).copied().unwrap_or(0)
    }
}

impl ImageDecoder for CountingDecoder {
    fn decode(&self, bytes: &[u8], format: PixelFormat) -> anyhow::Result<DecodedImage> {
        let contents = String::from_utf8_lossy(bytes).into_owned();
        *self.decoded.lock().entry(contents.clone()).or_default() += 1;
        anyhow::ensure!(!contents.starts_with("corrupt"), "corrupt image");
        Ok(DecodedImage {
            width: bytes.len() as u32,
            height: 1,
            channels: format.channels(),
            pixels: bytes.to_vec(),
        })
    }
}

/// Panics on meshes with exactly `poison_vertex_count` vertices, passes everything else through.
pub struct PoisonedOptimizer {
    pub poison_vertex_count: usize,
}

impl MeshOptimizer for PoisonedOptimizer {
    fn optimize(&self, vertices: &[Vertex], indices: &[u32]) -> MeshData {
        if vertices.len() == self.poison_vertex_count {
            panic!("poisoned mesh");
        }
        MeshData {
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
        }
    }
}

pub fn material(blend_mode: BlendMode, diffuse: Option<&str>) -> ImportedMaterial {
    ImportedMaterial {
        blend_mode,
        textures: diffuse
            .map(|name| (TextureSlot::Diffuse, name.to_string()))
            .into_iter()
            .collect(),
        ..Default::default()
    }
}

pub fn textured(diffuse: Option<&str>) -> ImportedMaterial {
    material(BlendMode::Opaque, diffuse)
}

pub fn translucent(diffuse: Option<&str>) -> ImportedMaterial {
    material(BlendMode::Blend, diffuse)
}

/// A strip of `triangle_count` triangles, tagged through the x coordinate so
/// output can be traced back to its source mesh.
pub fn strip(material_index: usize, triangle_count: u32, tag: f32) -> ImportedMesh {
    let vertex_count = triangle_count + 2;
    ImportedMesh {
        positions: (0..vertex_count)
            .map(|i| [tag, i as f32, (i % 2) as f32])
            .collect(),
        uvs: Some((0..vertex_count).map(|i| [0.0, i as f32]).collect()),
        normals: Some(vec![[0.0, 0.0, 1.0]; vertex_count as usize]),
        triangles: (0..triangle_count).map(|i| [i, i + 1, i + 2]).collect(),
        ..ImportedMesh::new(material_index)
    }
}

pub fn scene(materials: Vec<ImportedMaterial>, meshes: Vec<ImportedMesh>) -> ImportedScene {
    ImportedScene { materials, meshes }
}

pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("input")).unwrap();
        Self { dir }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    pub fn add_texture(&self, file_name: &str, contents: &str) {
        std::fs::write(self.input_dir().join(file_name), contents).unwrap();
    }

    pub fn config(&self, worker_threads: usize) -> Config {
        Config {
            worker_threads,
            use_mesh_optimizer: false,
            input_dir: self.input_dir(),
            output_dir: self.output_dir(),
            phase_timeout_secs: Some(30),
            ..Default::default()
        }
    }

    pub fn output(&self, file_name: &str) -> Vec<u8> {
        std::fs::read(self.output_dir().join(file_name)).unwrap()
    }

    pub fn output_text(&self, file_name: &str) -> String {
        String::from_utf8(self.output(file_name)).unwrap()
    }
}

pub struct Run {
    pub summary: RunSummary,
    pub report: WriteReport,
}

pub fn run(
    workspace: &Workspace,
    config: &Config,
    importer: MemoryImporter,
    decoder: Arc<CountingDecoder>,
    mesh_transform: MeshTransform,
    manifest: &str,
) -> Run {
    let mut pipeline =
        Pipeline::new(config, Arc::new(importer), decoder, mesh_transform).unwrap();
    let summary = pipeline.run(&Manifest::parse(manifest)).unwrap();
    let report = pipeline.write_outputs(&workspace.output_dir()).unwrap();
    Run { summary, report }
}
