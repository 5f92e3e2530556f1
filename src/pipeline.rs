use std::{
    collections::BTreeSet,
    fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use asset_common::scene::ImportedScene;
use relative_path::RelativePathBuf;

use crate::{
    asset_writer::{self, WriteReport},
    collections::{Buckets, Collections, MeshRecord, ModelContribution, ModelRecord},
    config_loader::Config,
    importer::{ImportOptions, SceneImporter},
    manifest::{Manifest, ManifestEntry},
    material::{resolve_material, Material, MaterialType, ResolvedMaterial},
    mesh_transform::{MeshData, MeshTransform},
    phase_barrier::PhaseError,
    slot::{take_all, Slot},
    task_queue::Task,
    texture::{load_texture, ImageDecoder, Texture, TextureRequest},
    worker_pool::WorkerPool,
};

/// Steps every input file goes through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileStage {
    Importing,
    MaterialPhase,
    TexturePhase,
    BucketAssignment,
    MeshPhase,
    Merge,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStage::Importing => "import",
            FileStage::MaterialPhase => "material phase",
            FileStage::TexturePhase => "texture phase",
            FileStage::BucketAssignment => "bucket assignment",
            FileStage::MeshPhase => "mesh phase",
            FileStage::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// Why a single input file was skipped. None of these stop the run.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("a model named {0:?} was already processed")]
    DuplicateModel(String),
    #[error("import failed: {0:#}")]
    Import(anyhow::Error),
    #[error("mesh {mesh} uses material {material_index}, but the scene has {material_count} materials")]
    DanglingMaterial {
        mesh: usize,
        material_index: usize,
        material_count: usize,
    },
    #[error("mesh {mesh} references vertex {index}, but it has {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("task {index} of the {stage} produced no result")]
    TaskFailed { stage: FileStage, index: usize },
}

impl FileError {
    pub fn stage(&self) -> FileStage {
        match self {
            FileError::DuplicateModel(_)
            | FileError::Import(_)
            | FileError::DanglingMaterial { .. }
            | FileError::IndexOutOfRange { .. } => FileStage::Importing,
            FileError::TaskFailed { stage, .. } => *stage,
        }
    }
}

enum StepError {
    File(FileError),
    Phase(PhaseError),
}

impl From<FileError> for StepError {
    fn from(err: FileError) -> Self {
        StepError::File(err)
    }
}

impl From<PhaseError> for StepError {
    fn from(err: PhaseError) -> Self {
        StepError::Phase(err)
    }
}

#[derive(Debug)]
pub struct SkippedFile {
    pub source: RelativePathBuf,
    pub error: FileError,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Model names in processing order.
    pub processed: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// A mesh whose bucket is known but whose data is still being produced.
struct PendingMesh {
    mesh_index: usize,
    material_index: usize,
    data: Arc<Slot<MeshData>>,
}

/// Drives every manifest entry through the phases and owns the results.
pub struct Pipeline {
    pool: WorkerPool,
    importer: Arc<dyn SceneImporter>,
    decoder: Arc<dyn ImageDecoder>,
    mesh_transform: MeshTransform,
    import_options: ImportOptions,
    input_dir: Arc<PathBuf>,
    phase_timeout: Option<Duration>,
    collections: Collections,
}

impl Pipeline {
    /// Spawns the worker threads.
    pub fn new(
        config: &Config,
        importer: Arc<dyn SceneImporter>,
        decoder: Arc<dyn ImageDecoder>,
        mesh_transform: MeshTransform,
    ) -> io::Result<Self> {
        Ok(Self {
            pool: WorkerPool::new(config.worker_threads)?,
            importer,
            decoder,
            mesh_transform,
            import_options: ImportOptions {
                pre_transform_vertices: config.pre_transform_vertices,
            },
            input_dir: Arc::new(config.input_dir.clone()),
            phase_timeout: config.phase_timeout(),
            collections: Collections::new(),
        })
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    /// Processes the manifest front to back. Files that fail are logged and
    /// skipped, only a stalled phase aborts the run.
    pub fn run(&mut self, manifest: &Manifest) -> Result<RunSummary, PhaseError> {
        let mut summary = RunSummary::default();
        for entry in &manifest.entries {
            match self.process_file(entry) {
                Ok(contribution) => {
                    log::debug!("{}: {}", entry.model_name, FileStage::Merge);
                    summary.processed.push(entry.model_name.clone());
                    self.collections.merge(contribution);
                }
                Err(StepError::File(error)) => {
                    log::warn!(
                        "Skipping {:?} during {}: {}",
                        entry.source,
                        error.stage(),
                        error
                    );
                    summary.skipped.push(SkippedFile {
                        source: entry.source.clone(),
                        error,
                    });
                }
                Err(StepError::Phase(error)) => return Err(error),
            }
        }
        log::info!(
            "Processed {} of {} files: {} textured and {} translucent meshes, {} textures",
            summary.processed.len(),
            manifest.len(),
            self.collections.meshes().get(MaterialType::Textured).len(),
            self.collections.meshes().get(MaterialType::Translucent).len(),
            self.collections.textures().len()
        );
        Ok(summary)
    }

    /// Runs the final write phase and the loader index write.
    pub fn write_outputs(self, output_dir: &Path) -> Result<WriteReport, PhaseError> {
        let Pipeline {
            pool,
            collections,
            phase_timeout,
            ..
        } = self;
        asset_writer::write_outputs(&pool, Arc::new(collections), output_dir, phase_timeout)
    }

    fn process_file(&mut self, entry: &ManifestEntry) -> Result<ModelContribution, StepError> {
        let model_name = &entry.model_name;
        if self.collections.has_model(model_name) {
            return Err(FileError::DuplicateModel(model_name.clone()).into());
        }

        let path = entry.path(&self.input_dir);
        log::debug!("{}: {} of {:?}", model_name, FileStage::Importing, path);
        let scene = self
            .importer
            .import(&path, &self.import_options)
            .map_err(FileError::Import)?;
        validate_scene(&scene)?;
        let scene = Arc::new(scene);
        log::info!(
            "{}: {} materials, {} meshes",
            model_name,
            scene.materials.len(),
            scene.meshes.len()
        );

        let resolved = self.material_phase(model_name, &scene)?;
        let texture_requests = self.new_texture_requests(&resolved);
        let attempted_textures: Vec<String> = texture_requests
            .iter()
            .map(|request| request.file_name.clone())
            .collect();
        let textures = self.texture_phase(model_name, texture_requests)?;
        self.collections.record_textures(attempted_textures, textures);
        let materials: Vec<Material> = resolved.into_iter().map(|r| r.material).collect();

        log::debug!("{}: {}", model_name, FileStage::BucketAssignment);
        let mut pending = Buckets::new();
        let mesh_slots: Vec<Arc<Slot<MeshData>>> = scene
            .meshes
            .iter()
            .enumerate()
            .map(|(mesh_index, mesh)| {
                let slot = Slot::new();
                pending.push(
                    materials[mesh.material_index].material_type,
                    PendingMesh {
                        mesh_index,
                        material_index: mesh.material_index,
                        data: Arc::clone(&slot),
                    },
                );
                slot
            })
            .collect();

        self.mesh_phase(model_name, &scene, mesh_slots)?;

        let base_instance = self.collections.next_base_instance();
        let mut meshes = Buckets::new();
        for (material_type, bucket) in pending.into_buckets() {
            for pending_mesh in bucket {
                let data = pending_mesh.data.take().ok_or(FileError::TaskFailed {
                    stage: FileStage::MeshPhase,
                    index: pending_mesh.mesh_index,
                })?;
                meshes.push(
                    material_type,
                    MeshRecord {
                        model_name: model_name.clone(),
                        material_index: pending_mesh.material_index,
                        base_instance,
                        data,
                    },
                );
            }
        }

        Ok(ModelContribution {
            model: ModelRecord {
                name: model_name.clone(),
                base_instance,
                materials,
            },
            meshes,
        })
    }

    fn material_phase(
        &self,
        model_name: &str,
        scene: &Arc<ImportedScene>,
    ) -> Result<Vec<ResolvedMaterial>, StepError> {
        let slots: Vec<Arc<Slot<ResolvedMaterial>>> =
            scene.materials.iter().map(|_| Slot::new()).collect();
        let tasks = slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let scene = Arc::clone(scene);
                let slot = Arc::clone(slot);
                Task::new(format!("{model_name} material {index}"), move || {
                    slot.fill(resolve_material(&scene.materials[index]))
                })
            })
            .collect();

        self.pool
            .run_phase(&format!("{model_name} materials"), tasks, self.phase_timeout)?;
        take_all(&slots).map_err(|index| {
            FileError::TaskFailed {
                stage: FileStage::MaterialPhase,
                index,
            }
            .into()
        })
    }

    /// Requests, in material order, for files neither an earlier file nor an
    /// earlier material of this file asked for. The first request for a file
    /// fixes its slot and pixel format.
    fn new_texture_requests(&self, resolved: &[ResolvedMaterial]) -> Vec<TextureRequest> {
        let mut seen = BTreeSet::new();
        resolved
            .iter()
            .flat_map(|material| material.texture_requests.iter())
            .filter(|request| {
                !self.collections.texture_attempted(&request.file_name)
                    && seen.insert(request.file_name.as_str())
            })
            .cloned()
            .collect()
    }

    fn texture_phase(
        &self,
        model_name: &str,
        requests: Vec<TextureRequest>,
    ) -> Result<Vec<Texture>, StepError> {
        let slots: Vec<Arc<Slot<anyhow::Result<Texture>>>> =
            requests.iter().map(|_| Slot::new()).collect();
        let tasks = requests
            .iter()
            .zip(&slots)
            .map(|(request, slot)| {
                let decoder = Arc::clone(&self.decoder);
                let input_dir = Arc::clone(&self.input_dir);
                let request = request.clone();
                let slot = Arc::clone(slot);
                Task::new(format!("texture {}", request.file_name), move || {
                    slot.fill(load_texture(&*decoder, &input_dir, &request))
                })
            })
            .collect();

        self.pool
            .run_phase(&format!("{model_name} textures"), tasks, self.phase_timeout)?;

        let mut textures = Vec::with_capacity(requests.len());
        for (request, slot) in requests.iter().zip(&slots) {
            match slot.take() {
                Some(Ok(texture)) => textures.push(texture),
                Some(Err(err)) => log::warn!(
                    "Texture {:?} of {} is left out: {:#}",
                    request.file_name,
                    model_name,
                    err
                ),
                None => log::error!(
                    "Decoding texture {:?} of {} did not finish, it is left out",
                    request.file_name,
                    model_name
                ),
            }
        }
        Ok(textures)
    }

    fn mesh_phase(
        &self,
        model_name: &str,
        scene: &Arc<ImportedScene>,
        slots: Vec<Arc<Slot<MeshData>>>,
    ) -> Result<(), StepError> {
        let tasks = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                let scene = Arc::clone(scene);
                let mesh_transform = self.mesh_transform.clone();
                Task::new(format!("{model_name} mesh {index}"), move || {
                    slot.fill(mesh_transform.apply(&scene.meshes[index]))
                })
            })
            .collect();
        self.pool
            .run_phase(&format!("{model_name} meshes"), tasks, self.phase_timeout)?;
        Ok(())
    }
}

/// Rejects scenes whose references would point outside their own arrays.
fn validate_scene(scene: &ImportedScene) -> Result<(), FileError> {
    if let Some((mesh, material_index)) = scene.find_dangling_material_ref() {
        return Err(FileError::DanglingMaterial {
            mesh,
            material_index,
            material_count: scene.materials.len(),
        });
    }
    for (mesh_index, mesh) in scene.meshes.iter().enumerate() {
        if let Some(index) = mesh.find_out_of_range_index() {
            return Err(FileError::IndexOutOfRange {
                mesh: mesh_index,
                index,
                vertex_count: mesh.vertex_count(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use asset_common::scene::{ImportedMaterial, ImportedMesh};

    use super::*;

    #[test]
    fn out_of_range_references_are_import_failures() {
        let mut scene = ImportedScene::new();
        scene.materials.push(ImportedMaterial::default());
        scene.meshes.push(ImportedMesh {
            positions: vec![[0.0; 3]; 3],
            triangles: vec![[0, 1, 3]],
            ..ImportedMesh::new(0)
        });
        let err = validate_scene(&scene).unwrap_err();
        assert!(matches!(err, FileError::IndexOutOfRange { index: 3, .. }));
        assert_eq!(err.stage(), FileStage::Importing);

        scene.meshes[0].material_index = 1;
        assert!(matches!(
            validate_scene(&scene),
            Err(FileError::DanglingMaterial {
                material_index: 1,
                ..
            })
        ));
    }
}
