use std::{collections::BTreeMap, fmt};

use asset_common::scene::{BlendMode, ImportedMaterial, TextureSlot};

use crate::texture::{PixelFormat, TextureRequest};

/// Selects the bucket a mesh lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MaterialType {
    Textured,
    Translucent,
}

impl MaterialType {
    /// The order buckets appear in every output file.
    pub const BUCKET_ORDER: [MaterialType; 2] = [MaterialType::Textured, MaterialType::Translucent];
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialType::Textured => f.write_str("textured"),
            MaterialType::Translucent => f.write_str("translucent"),
        }
    }
}

/// Where a translucent material takes its alpha from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlphaSource {
    DiffuseAlpha,
    AlphaTexture,
    ConstantOpacity,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub material_type: MaterialType,
    pub alpha_source: AlphaSource,
    pub opacity: f32,
    pub color: [f32; 4],
    /// Only the slots a texture was requested for.
    pub texture_names: BTreeMap<TextureSlot, String>,
}

impl Material {
    pub fn diffuse_texture(&self) -> Option<&str> {
        self.texture_names
            .get(&TextureSlot::Diffuse)
            .map(String::as_str)
    }
}

/// Output of one material task.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMaterial {
    pub material: Material,
    /// In the order the textures should be decoded.
    pub texture_requests: Vec<TextureRequest>,
}

pub fn resolve_material(imported: &ImportedMaterial) -> ResolvedMaterial {
    let mut requests = Vec::new();
    let mut request = |slot: TextureSlot, format: PixelFormat| {
        if let Some(file_name) = imported.texture(slot) {
            requests.push(TextureRequest::new(file_name, slot, format));
        }
    };

    let (material_type, alpha_source) = if imported.blend_mode == BlendMode::Blend {
        let alpha_source = if imported.texture(TextureSlot::Opacity).is_some() {
            request(TextureSlot::Opacity, PixelFormat::Rgb);
            AlphaSource::AlphaTexture
        } else if imported.opacity != 1.0 {
            AlphaSource::ConstantOpacity
        } else {
            request(TextureSlot::Diffuse, PixelFormat::Rgba);
            AlphaSource::DiffuseAlpha
        };
        (MaterialType::Translucent, alpha_source)
    } else {
        request(TextureSlot::Diffuse, PixelFormat::Rgb);
        request(TextureSlot::Normals, PixelFormat::Rgb);
        request(TextureSlot::Unknown, PixelFormat::Rgb);
        (MaterialType::Textured, AlphaSource::DiffuseAlpha)
    };
    request(TextureSlot::Emissive, PixelFormat::Rgb);

    let texture_names = requests
        .iter()
        .map(|request| (request.slot, request.file_name.clone()))
        .collect();
    ResolvedMaterial {
        material: Material {
            name: imported.name.clone(),
            material_type,
            alpha_source,
            opacity: imported.opacity,
            color: imported.base_color,
            texture_names,
        },
        texture_requests: requests,
    }
}
