//! Process-wide results, owned by the orchestrator.
//!
//! Worker tasks never touch these. The orchestrator mutates them between phases
//! and the writers only read them once every file was processed.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    material::{Material, MaterialType},
    mesh_transform::MeshData,
    texture::Texture,
};

/// One value list per material type, traversed in [`MaterialType::BUCKET_ORDER`].
#[derive(Clone, Debug, PartialEq)]
pub struct Buckets<T> {
    textured: Vec<T>,
    translucent: Vec<T>,
}

impl<T> Default for Buckets<T> {
    fn default() -> Self {
        Self {
            textured: Vec::new(),
            translucent: Vec::new(),
        }
    }
}

impl<T> Buckets<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, material_type: MaterialType) -> &[T] {
        match material_type {
            MaterialType::Textured => &self.textured,
            MaterialType::Translucent => &self.translucent,
        }
    }

    fn get_mut(&mut self, material_type: MaterialType) -> &mut Vec<T> {
        match material_type {
            MaterialType::Textured => &mut self.textured,
            MaterialType::Translucent => &mut self.translucent,
        }
    }

    pub fn push(&mut self, material_type: MaterialType, value: T) {
        self.get_mut(material_type).push(value);
    }

    /// Appends every bucket of `other` to the end of the matching bucket.
    pub fn append(&mut self, other: Buckets<T>) {
        self.textured.extend(other.textured);
        self.translucent.extend(other.translucent);
    }

    /// The one traversal every writer uses.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        MaterialType::BUCKET_ORDER
            .into_iter()
            .flat_map(move |material_type| self.get(material_type).iter())
    }

    pub fn into_buckets(self) -> impl Iterator<Item = (MaterialType, Vec<T>)> {
        [
            (MaterialType::Textured, self.textured),
            (MaterialType::Translucent, self.translucent),
        ]
        .into_iter()
    }

    pub fn len(&self) -> usize {
        self.textured.len() + self.translucent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelRecord {
    pub name: String,
    pub base_instance: u32,
    /// In scene material index order.
    pub materials: Vec<Material>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshRecord {
    pub model_name: String,
    pub material_index: usize,
    pub base_instance: u32,
    pub data: MeshData,
}

/// Model and meshes of one successfully processed file.
pub struct ModelContribution {
    pub model: ModelRecord,
    pub meshes: Buckets<MeshRecord>,
}

#[derive(Default)]
pub struct Collections {
    models: Vec<ModelRecord>,
    meshes: Buckets<MeshRecord>,
    /// Sorted by file name.
    textures: BTreeMap<String, Texture>,
    attempted_textures: BTreeSet<String>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(&self) -> &[ModelRecord] {
        &self.models
    }

    pub fn meshes(&self) -> &Buckets<MeshRecord> {
        &self.meshes
    }

    pub fn textures(&self) -> &BTreeMap<String, Texture> {
        &self.textures
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.iter().any(|model| model.name == name)
    }

    /// Base instance of the next model, one per processed file.
    pub fn next_base_instance(&self) -> u32 {
        self.models.len() as u32
    }

    /// Whether some earlier file already tried to decode `file_name`.
    pub fn texture_attempted(&self, file_name: &str) -> bool {
        self.attempted_textures.contains(file_name)
    }

    /// Commits the outcome of a texture phase. `attempted` lists every file name
    /// the phase tried, whether decoding worked or not. Kept even if the file that
    /// requested them fails later, so no name is ever decoded twice.
    pub fn record_textures(&mut self, attempted: Vec<String>, textures: Vec<Texture>) {
        self.attempted_textures.extend(attempted);
        for texture in textures {
            let previous = self.textures.insert(texture.file_name.clone(), texture);
            debug_assert!(previous.is_none(), "texture decoded twice");
        }
    }

    pub fn merge(&mut self, contribution: ModelContribution) {
        self.meshes.append(contribution.meshes);
        self.models.push(contribution.model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_puts_textured_first() {
        let mut buckets = Buckets::new();
        buckets.push(MaterialType::Translucent, "a-translucent");
        buckets.push(MaterialType::Textured, "a-textured");

        let mut next_file = Buckets::new();
        next_file.push(MaterialType::Translucent, "b-translucent");
        buckets.append(next_file);

        assert_eq!(
            buckets.iter().copied().collect::<Vec<_>>(),
            vec!["a-textured", "a-translucent", "b-translucent"]
        );
        assert_eq!(buckets.get(MaterialType::Translucent).len(), 2);
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn merge_records_models() {
        let mut collections = Collections::new();
        assert_eq!(collections.next_base_instance(), 0);

        collections.merge(ModelContribution {
            model: ModelRecord {
                name: "chair".into(),
                base_instance: 0,
                materials: Vec::new(),
            },
            meshes: Buckets::new(),
        });

        assert!(collections.has_model("chair"));
        assert_eq!(collections.next_base_instance(), 1);
    }

    #[test]
    fn failed_decodes_count_as_attempted() {
        let mut collections = Collections::new();
        collections.record_textures(
            vec!["broken.png".into(), "wood.png".into()],
            vec![Texture {
                file_name: "wood.png".into(),
                slot: asset_common::scene::TextureSlot::Diffuse,
                width: 1,
                height: 1,
                channels: 3,
                pixels: vec![0; 3],
            }],
        );

        assert!(collections.texture_attempted("broken.png"));
        assert!(collections.texture_attempted("wood.png"));
        assert!(!collections.texture_attempted("other.png"));
        assert_eq!(
            collections.textures().keys().collect::<Vec<_>>(),
            vec!["wood.png"]
        );
        assert!(collections.models().is_empty());
    }
}
