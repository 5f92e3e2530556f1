use std::path::{Path, PathBuf};

use anyhow::Context;
use relative_path::{RelativePath, RelativePathBuf};

/// One line of the manifest: a model file relative to the input directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub source: RelativePathBuf,
    pub model_name: String,
}

impl ManifestEntry {
    /// `None` for lines that do not name a file.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let source = RelativePathBuf::from(line.replace('\\', "/"));
        let model_name = model_name(&source);
        if model_name.is_empty() || model_name.ends_with('/') {
            return None;
        }
        Some(Self { source, model_name })
    }

    pub fn path(&self, input_dir: &Path) -> PathBuf {
        self.source.to_path(input_dir)
    }
}

/// The entry with everything from the first `.` of its file name cut off.
/// `props/lamp.v2.gltf` becomes `props/lamp`.
pub fn model_name(source: &RelativePath) -> String {
    let path = source.as_str();
    let file_name_start = path.rfind('/').map_or(0, |i| i + 1);
    let end = path[file_name_start..]
        .find('.')
        .map_or(path.len(), |dot| file_name_start + dot);
    path[..end].to_string()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open manifest {:?}", path))?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        for (line_number, line) in text.lines().enumerate() {
            match ManifestEntry::parse(line) {
                Some(entry) => entries.push(entry),
                None if line.trim().is_empty() => {}
                None => log::warn!(
                    "Manifest line {}: {:?} does not name a model file, skipping",
                    line_number + 1,
                    line
                ),
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
