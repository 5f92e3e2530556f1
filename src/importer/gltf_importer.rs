use std::{collections::BTreeMap, path::Path};

use anyhow::{bail, Context};
use asset_common::{
    scene::{BlendMode, ImportedMaterial, ImportedMesh, ImportedScene, TextureSlot},
    transform::Transform,
};
use gltf::{material::AlphaMode, mesh::Mode, Gltf};
use ultraviolet::Vec3;

use super::{ImportOptions, SceneImporter};

/// Reads `.gltf` and `.glb` files. Only buffers are loaded, textures are
/// referenced by file name and decoded later.
#[derive(Default)]
pub struct GltfImporter {}

impl GltfImporter {
    pub fn new() -> Self {
        Self {}
    }
}

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path, options: &ImportOptions) -> anyhow::Result<ImportedScene> {
        let Gltf { document, blob } =
            Gltf::open(path).with_context(|| format!("Failed to parse {:?}", path))?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)
            .with_context(|| format!("Failed to load the buffers of {:?}", path))?;

        let mut loading_data = SceneLoadingData::new(buffers);
        loading_data.scene.materials = document.materials().map(|m| load_material(&m)).collect();

        if options.pre_transform_vertices {
            let scene = document
                .default_scene()
                .or_else(|| document.scenes().next())
                .with_context(|| format!("{:?} contains no scene", path))?;
            for node in scene.nodes() {
                load_node(&mut loading_data, &node, Transform::default())?;
            }
        } else {
            for mesh in document.meshes() {
                load_mesh(&mut loading_data, &mesh, None)?;
            }
        }

        Ok(loading_data.scene)
    }
}

struct SceneLoadingData {
    scene: ImportedScene,
    buffers: Vec<gltf::buffer::Data>,
    default_material: Option<usize>,
}

impl SceneLoadingData {
    fn new(buffers: Vec<gltf::buffer::Data>) -> Self {
        Self {
            scene: ImportedScene::new(),
            buffers,
            default_material: None,
        }
    }

    /// Primitives without a material share one appended default material.
    fn default_material_index(&mut self) -> usize {
        let materials = &mut self.scene.materials;
        *self.default_material.get_or_insert_with(|| {
            materials.push(ImportedMaterial {
                name: Some("default".into()),
                ..Default::default()
            });
            materials.len() - 1
        })
    }
}

fn load_node(
    loading_data: &mut SceneLoadingData,
    node: &gltf::Node<'_>,
    parent_transform: Transform,
) -> anyhow::Result<()> {
    let local_transform = {
        let (position, orientation, scale) = node.transform().decomposed();
        Transform::from_arrays(position, orientation, scale)
    };
    let global_transform = &parent_transform * local_transform;

    if let Some(mesh) = node.mesh() {
        load_mesh(loading_data, &mesh, Some(&global_transform))?;
    }

    for child in node.children() {
        load_node(loading_data, &child, global_transform.clone())?;
    }
    Ok(())
}

fn load_mesh(
    loading_data: &mut SceneLoadingData,
    mesh: &gltf::Mesh<'_>,
    transform: Option<&Transform>,
) -> anyhow::Result<()> {
    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            log::warn!(
                "Skipping {:?} primitive {} of mesh {:?}, only triangles are supported",
                primitive.mode(),
                primitive.index(),
                mesh.name().unwrap_or_default()
            );
            continue;
        }

        let reader = primitive
            .reader(|buffer| loading_data.buffers.get(buffer.index()).map(|v| &v.0[..]));
        let Some(positions) = reader.read_positions() else {
            log::warn!(
                "Skipping primitive {} of mesh {:?} without positions",
                primitive.index(),
                mesh.name().unwrap_or_default()
            );
            continue;
        };
        let mut positions: Vec<[f32; 3]> = positions.collect();
        let mut normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
        let uvs = reader
            .read_tex_coords(0)
            .map(|tex_coords| tex_coords.into_f32().collect());
        let indices: Vec<u32> = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());
        if indices.len() % 3 != 0 {
            bail!(
                "Primitive {} of mesh {:?} has {} indices, which is not a triangle list",
                primitive.index(),
                mesh.name().unwrap_or_default(),
                indices.len()
            );
        }

        if let Some(transform) = transform.filter(|t| !t.is_identity()) {
            for position in positions.iter_mut() {
                *position = transform.transform_point(Vec3::from(*position)).into();
            }
            for normal in normals.iter_mut().flatten() {
                *normal = transform.transform_normal(Vec3::from(*normal)).into();
            }
        }

        let material_index = match primitive.material().index() {
            Some(index) => index,
            None => loading_data.default_material_index(),
        };

        loading_data.scene.meshes.push(ImportedMesh {
            name: mesh.name().map(str::to_string),
            material_index,
            positions,
            uvs,
            normals,
            triangles: indices
                .chunks_exact(3)
                .map(|corners| [corners[0], corners[1], corners[2]])
                .collect(),
        });
    }
    Ok(())
}

fn load_material(material: &gltf::Material<'_>) -> ImportedMaterial {
    let material_pbr = material.pbr_metallic_roughness();
    let base_color = material_pbr.base_color_factor();

    let mut textures = BTreeMap::new();
    insert_texture(
        &mut textures,
        TextureSlot::Diffuse,
        material_pbr.base_color_texture().map(|info| info.texture()),
    );
    insert_texture(
        &mut textures,
        TextureSlot::Normals,
        material.normal_texture().map(|info| info.texture()),
    );
    insert_texture(
        &mut textures,
        TextureSlot::Emissive,
        material.emissive_texture().map(|info| info.texture()),
    );
    insert_texture(
        &mut textures,
        TextureSlot::Unknown,
        material_pbr
            .metallic_roughness_texture()
            .map(|info| info.texture()),
    );

    ImportedMaterial {
        name: material.name().map(str::to_string),
        blend_mode: match material.alpha_mode() {
            AlphaMode::Opaque => BlendMode::Opaque,
            AlphaMode::Mask => BlendMode::Mask,
            AlphaMode::Blend => BlendMode::Blend,
        },
        base_color,
        opacity: base_color[3],
        textures,
    }
}

fn insert_texture(
    textures: &mut BTreeMap<TextureSlot, String>,
    slot: TextureSlot,
    texture: Option<gltf::Texture<'_>>,
) {
    let Some(texture) = texture else {
        return;
    };
    match texture.source().source() {
        gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
            textures.insert(slot, uri.to_string());
        }
        _ => log::debug!(
            "The {} texture {} is embedded and has no file name, leaving it out",
            slot,
            texture.index()
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// One triangle with an indexed buffer, a blended material and a diffuse texture file name,
    /// referenced by a node that is moved along x.
    fn write_triangle_gltf(dir: &Path) -> std::path::PathBuf {
        let mut buffer = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
        for index in [0u32, 1, 2] {
            buffer.extend_from_slice(&index.to_le_bytes());
        }
        std::fs::File::create(dir.join("triangle.bin"))
            .unwrap()
            .write_all(&buffer)
            .unwrap();

        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [ { "nodes": [0] } ],
            "nodes": [ { "mesh": 0, "translation": [10.0, 0.0, 0.0] } ],
            "meshes": [ { "name": "tri", "primitives": [
                { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 },
                { "attributes": { "POSITION": 0 } }
            ] } ],
            "materials": [ {
                "alphaMode": "BLEND",
                "pbrMetallicRoughness": {
                    "baseColorFactor": [1.0, 1.0, 1.0, 0.5],
                    "baseColorTexture": { "index": 0 }
                }
            } ],
            "textures": [ { "source": 0 } ],
            "images": [ { "uri": "glass.png" } ],
            "buffers": [ { "uri": "triangle.bin", "byteLength": 48 } ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 12 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
                { "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" }
            ]
        }"#;
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn imports_materials_meshes_and_texture_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle_gltf(dir.path());

        let scene = GltfImporter::new()
            .import(
                &path,
                &ImportOptions {
                    pre_transform_vertices: true,
                },
            )
            .unwrap();

        // The second primitive has no material and gets the appended default one.
        assert_eq!(scene.materials.len(), 2);
        let glass = &scene.materials[0];
        assert_eq!(glass.blend_mode, BlendMode::Blend);
        assert_eq!(glass.opacity, 0.5);
        assert_eq!(glass.texture(TextureSlot::Diffuse), Some("glass.png"));
        assert_eq!(scene.materials[1].blend_mode, BlendMode::Opaque);

        assert_eq!(scene.meshes.len(), 2);
        assert_eq!(scene.meshes[0].material_index, 0);
        assert_eq!(scene.meshes[1].material_index, 1);
        assert_eq!(scene.meshes[0].triangles, vec![[0, 1, 2]]);
        assert_eq!(scene.meshes[0].positions[1], [11.0, 0.0, 0.0]);
        assert!(scene.meshes[0].uvs.is_none());
    }

    #[test]
    fn local_space_import_keeps_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle_gltf(dir.path());

        let scene = GltfImporter::new()
            .import(
                &path,
                &ImportOptions {
                    pre_transform_vertices: false,
                },
            )
            .unwrap();
        assert_eq!(scene.meshes[0].positions[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn unreadable_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let options = ImportOptions {
            pre_transform_vertices: true,
        };
        let importer = GltfImporter::new();
        assert!(importer
            .import(&dir.path().join("missing.gltf"), &options)
            .is_err());

        let garbage = dir.path().join("garbage.gltf");
        std::fs::write(&garbage, "not a model").unwrap();
        assert!(importer.import(&garbage, &options).is_err());
    }
}
