//! Serializes the collections into the five output files.
//!
//! Every writer walks the meshes through [`Buckets::iter`], so the offsets in the
//! loader index line up with the physical layout of the two buffer files.

use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use asset_common::{
    artifact::{
        DrawRecord, LoaderHeader, TextureHeader, INDEX_BUFFER_FILE, LOADER_INDEX_FILE,
        MATERIAL_FILE, TEXTURE_FILE, VERTEX_BUFFER_FILE,
    },
    scene::TextureSlot,
};

use crate::{
    collections::{Buckets, Collections, MeshRecord, ModelRecord},
    phase_barrier::PhaseError,
    slot::Slot,
    task_queue::Task,
    texture::Texture,
    worker_pool::WorkerPool,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Artifact {
    VertexBuffer,
    IndexBuffer,
    Materials,
    Textures,
    LoaderIndex,
}

impl Artifact {
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::VertexBuffer => VERTEX_BUFFER_FILE,
            Artifact::IndexBuffer => INDEX_BUFFER_FILE,
            Artifact::Materials => MATERIAL_FILE,
            Artifact::Textures => TEXTURE_FILE,
            Artifact::LoaderIndex => LOADER_INDEX_FILE,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Bytes per successfully written artifact.
    pub written: BTreeMap<Artifact, u64>,
    pub failed: Vec<Artifact>,
}

impl WriteReport {
    pub fn bytes(&self, artifact: Artifact) -> Option<u64> {
        self.written.get(&artifact).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes the four independent artifacts in parallel, then the loader index,
/// which needs the byte totals of both buffer files.
///
/// An artifact that cannot be written is logged and skipped, its siblings are unaffected.
pub fn write_outputs(
    pool: &WorkerPool,
    collections: Arc<Collections>,
    output_dir: &Path,
    timeout: Option<Duration>,
) -> Result<WriteReport, PhaseError> {
    if let Err(err) = std::fs::create_dir_all(output_dir) {
        log::warn!("Failed to create output directory {:?}: {}", output_dir, err);
    }

    let writers: [(Artifact, ArtifactWriter); 4] = [
        (Artifact::VertexBuffer, |c, out| write_vertex_buffer(c.meshes(), out)),
        (Artifact::IndexBuffer, |c, out| write_index_buffer(c.meshes(), out)),
        (Artifact::Materials, |c, out| write_materials(c.models(), out)),
        (Artifact::Textures, |c, out| write_textures(c.textures(), out)),
    ];
    let slots: Vec<Arc<Slot<anyhow::Result<u64>>>> = writers.iter().map(|_| Slot::new()).collect();
    let tasks = writers
        .iter()
        .zip(&slots)
        .map(|(&(artifact, writer), slot)| {
            let collections = Arc::clone(&collections);
            let path = output_dir.join(artifact.file_name());
            let slot = Arc::clone(slot);
            Task::new(format!("write {artifact}"), move || {
                slot.fill(write_file(&path, |out| writer(&collections, out)))
            })
        })
        .collect();

    pool.run_phase("final write", tasks, timeout)?;

    let mut report = WriteReport::default();
    for (&(artifact, _), slot) in writers.iter().zip(&slots) {
        match slot.take() {
            Some(Ok(bytes)) => {
                log::info!("Wrote {} ({} bytes)", artifact, bytes);
                report.written.insert(artifact, bytes);
            }
            Some(Err(err)) => {
                log::error!("Skipping {}: {:#}", artifact, err);
                report.failed.push(artifact);
            }
            None => {
                log::error!("Skipping {}: the writer did not finish", artifact);
                report.failed.push(artifact);
            }
        }
    }

    let totals = (
        report.bytes(Artifact::VertexBuffer),
        report.bytes(Artifact::IndexBuffer),
    );
    let loader_result = match totals {
        (Some(vertex_bytes), Some(index_bytes)) => {
            let path = output_dir.join(Artifact::LoaderIndex.file_name());
            write_file(&path, |out| {
                write_loader_index(collections.meshes(), vertex_bytes, index_bytes, out)
            })
        }
        _ => Err(anyhow::anyhow!(
            "the buffer files were not written, so their offsets are unknown"
        )),
    };
    match loader_result {
        Ok(bytes) => {
            log::info!("Wrote {} ({} bytes)", Artifact::LoaderIndex, bytes);
            report.written.insert(Artifact::LoaderIndex, bytes);
        }
        Err(err) => {
            log::error!("Skipping {}: {:#}", Artifact::LoaderIndex, err);
            report.failed.push(Artifact::LoaderIndex);
        }
    }

    Ok(report)
}

type ArtifactWriter = fn(&Collections, &mut CountingWriter<BufWriter<File>>) -> io::Result<()>;

/// Counts what goes through it.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_file(
    path: &Path,
    write: impl FnOnce(&mut CountingWriter<BufWriter<File>>) -> io::Result<()>,
) -> anyhow::Result<u64> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut out = CountingWriter {
        inner: BufWriter::new(file),
        count: 0,
    };
    write(&mut out)
        .and_then(|()| out.flush())
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(out.count)
}

/// Raw vertex records, no header and no separators.
pub fn write_vertex_buffer(meshes: &Buckets<MeshRecord>, out: &mut impl Write) -> io::Result<()> {
    for mesh in meshes.iter() {
        out.write_all(mesh.data.vertex_bytes())?;
    }
    Ok(())
}

/// Raw 32 bit indices, local to each mesh.
pub fn write_index_buffer(meshes: &Buckets<MeshRecord>, out: &mut impl Write) -> io::Result<()> {
    for mesh in meshes.iter() {
        out.write_all(mesh.data.index_bytes())?;
    }
    Ok(())
}

/// One draw record per mesh, with running vertex and index offsets.
pub fn draw_records(meshes: &Buckets<MeshRecord>) -> Vec<DrawRecord> {
    let mut base_vertex = 0u64;
    let mut first_index = 0u64;
    meshes
        .iter()
        .map(|mesh| {
            let record = DrawRecord {
                model_name: mesh.model_name.clone(),
                material_index: mesh.material_index as u64,
                index_count: mesh.data.index_count() as u64,
                base_vertex,
                first_index,
                base_instance: mesh.base_instance as u64,
            };
            base_vertex += mesh.data.vertex_count() as u64;
            first_index += mesh.data.index_count() as u64;
            record
        })
        .collect()
}

pub fn write_loader_index(
    meshes: &Buckets<MeshRecord>,
    vertex_buffer_bytes: u64,
    index_buffer_bytes: u64,
    out: &mut impl Write,
) -> io::Result<()> {
    let header = LoaderHeader {
        vertex_buffer_bytes,
        index_buffer_bytes,
        mesh_count: meshes.len() as u64,
    };
    writeln!(out, "{header}")?;
    for record in draw_records(meshes) {
        writeln!(out, "{record}")?;
    }
    Ok(())
}

/// Per model, sorted by name, a `<name> <material count>` line, then one diffuse
/// texture name per material, empty when it has none.
pub fn write_materials(models: &[ModelRecord], out: &mut impl Write) -> io::Result<()> {
    let by_name: BTreeMap<&str, &ModelRecord> = models
        .iter()
        .map(|model| (model.name.as_str(), model))
        .collect();
    for model in by_name.into_values() {
        writeln!(out, "{} {}", model.name, model.materials.len())?;
        for material in &model.materials {
            writeln!(out, "{}", material.diffuse_texture().unwrap_or_default())?;
        }
    }
    Ok(())
}

/// Only textures first used as a diffuse map are stored, the other slots are
/// decoded but have no consumer yet.
pub fn write_textures(
    textures: &BTreeMap<String, Texture>,
    out: &mut impl Write,
) -> io::Result<()> {
    for texture in textures
        .values()
        .filter(|texture| texture.slot == TextureSlot::Diffuse)
    {
        let header = TextureHeader {
            name: &texture.file_name,
            width: texture.width,
            height: texture.height,
            byte_length: texture.byte_length(),
        };
        writeln!(out, "{header}")?;
        out.write_all(&texture.pixels)?;
    }
    Ok(())
}
