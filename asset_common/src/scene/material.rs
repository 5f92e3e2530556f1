use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// The kinds of texture a material can reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum TextureSlot {
    /// Base color / albedo
    Diffuse,
    Normals,
    Emissive,
    /// Dedicated alpha mask
    Opacity,
    /// Anything the importer could not classify, for glTF that is the metallic-roughness map.
    Unknown,
}

impl fmt::Display for TextureSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextureSlot::Diffuse => "diffuse",
            TextureSlot::Normals => "normals",
            TextureSlot::Emissive => "emissive",
            TextureSlot::Opacity => "opacity",
            TextureSlot::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum BlendMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ImportedMaterial {
    pub name: Option<String>,
    pub blend_mode: BlendMode,
    pub base_color: [f32; 4],
    pub opacity: f32,
    /// Texture file names, relative to the input directory.
    pub textures: BTreeMap<TextureSlot, String>,
}

impl ImportedMaterial {
    pub fn texture(&self, slot: TextureSlot) -> Option<&str> {
        self.textures.get(&slot).map(String::as_str)
    }
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            name: None,
            blend_mode: BlendMode::Opaque,
            base_color: [1.0; 4],
            opacity: 1.0,
            textures: BTreeMap::new(),
        }
    }
}
