//! Scene → glTF document + binary buffer, ready for GLB packing.
//!
//! Every object becomes a root node with one mesh; every material slot used
//! by the object's faces becomes one primitive. Polygons are fan
//! triangulated and face-corner data is unrolled into per-vertex attributes.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use gltf::json as gltf_json;
use gltf_json::{
    accessor::{ComponentType, GenericComponentType},
    validation::{Checked, USize64},
};
use tracing::warn;

use crate::math;
use crate::scene::material::OutputSocket;
use crate::scene::{BlendMethod, ImageId, Material, MaterialId, Mesh, PrincipledSocket, Scene};

const GENERATOR: &str = concat!("zone-glb-tools ", env!("CARGO_PKG_VERSION"));

struct GltfBuilder {
    bin: Vec<u8>,
    buffer_views: Vec<gltf_json::buffer::View>,
    accessors: Vec<gltf_json::Accessor>,
    meshes: Vec<gltf_json::Mesh>,
    materials: Vec<gltf_json::Material>,
    nodes: Vec<gltf_json::Node>,
    images: Vec<gltf_json::Image>,
    samplers: Vec<gltf_json::texture::Sampler>,
    textures: Vec<gltf_json::Texture>,
    material_map: HashMap<MaterialId, u32>,
    texture_map: HashMap<ImageId, Option<u32>>,
}

impl GltfBuilder {
    fn new() -> Self {
        Self {
            bin: Vec::new(),
            buffer_views: Vec::new(),
            accessors: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            nodes: Vec::new(),
            images: Vec::new(),
            samplers: Vec::new(),
            textures: Vec::new(),
            material_map: HashMap::new(),
            texture_map: HashMap::new(),
        }
    }

    /// Append bytes to the binary buffer (4-byte aligned) and add a view.
    fn push_view(
        &mut self,
        bytes: &[u8],
        target: Option<gltf_json::buffer::Target>,
        name: &str,
    ) -> u32 {
        let pad = (4 - (self.bin.len() % 4)) % 4;
        self.bin.resize(self.bin.len() + pad, 0);
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);

        let view_idx = self.buffer_views.len() as u32;
        self.buffer_views.push(gltf_json::buffer::View {
            buffer: gltf_json::Index::new(0),
            byte_length: USize64(bytes.len() as u64),
            byte_offset: Some(USize64(offset as u64)),
            target: target.map(Checked::Valid),
            byte_stride: None,
            extensions: None,
            extras: None,
            name: Some(format!("{}_view", name)),
        });
        view_idx
    }

    fn add_accessor_f32(
        &mut self,
        data: &[f32],
        name: &str,
        acc_type: gltf_json::accessor::Type,
        components_per_element: usize,
        min: Option<serde_json::Value>,
        max: Option<serde_json::Value>,
    ) -> u32 {
        let bytes: Vec<u8> = data.iter().flat_map(|f| f.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(gltf_json::buffer::Target::ArrayBuffer), name);

        let acc_idx = self.accessors.len() as u32;
        self.accessors.push(gltf_json::Accessor {
            buffer_view: Some(gltf_json::Index::new(view)),
            byte_offset: Some(USize64(0)),
            component_type: Checked::Valid(GenericComponentType(ComponentType::F32)),
            count: USize64((data.len() / components_per_element) as u64),
            extensions: None,
            extras: None,
            max,
            min,
            name: Some(format!("{}_accessor", name)),
            normalized: false,
            sparse: None,
            type_: Checked::Valid(acc_type),
        });
        acc_idx
    }

    fn add_index_accessor(&mut self, indices: &[u32], name: &str) -> u32 {
        // u16 when every index fits
        let (bytes, comp_type) = if indices.iter().all(|&i| i <= u16::MAX as u32) {
            let b: Vec<u8> = indices
                .iter()
                .flat_map(|&i| (i as u16).to_le_bytes())
                .collect();
            (b, ComponentType::U16)
        } else {
            let b: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
            (b, ComponentType::U32)
        };
        let view = self.push_view(
            &bytes,
            Some(gltf_json::buffer::Target::ElementArrayBuffer),
            name,
        );

        let acc_idx = self.accessors.len() as u32;
        self.accessors.push(gltf_json::Accessor {
            buffer_view: Some(gltf_json::Index::new(view)),
            byte_offset: Some(USize64(0)),
            component_type: Checked::Valid(GenericComponentType(comp_type)),
            count: USize64(indices.len() as u64),
            extensions: None,
            extras: None,
            max: None,
            min: None,
            name: Some(format!("{}_accessor", name)),
            normalized: false,
            sparse: None,
            type_: Checked::Valid(gltf_json::accessor::Type::Scalar),
        });
        acc_idx
    }

    /// Embed an image as PNG, returning its texture index. Cached per image.
    fn texture_for(&mut self, scene: &Scene, image: ImageId) -> Option<u32> {
        if let Some(cached) = self.texture_map.get(&image) {
            return *cached;
        }
        let texture = self.embed_texture(scene, image);
        self.texture_map.insert(image, texture);
        texture
    }

    fn embed_texture(&mut self, scene: &Scene, image: ImageId) -> Option<u32> {
        let source = scene.image(image)?;
        let decoded = match image::open(&source.path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Failed to load texture {}: {}", source.path.display(), e);
                return None;
            }
        };
        let mut png = std::io::Cursor::new(Vec::new());
        if let Err(e) = decoded.write_to(&mut png, image::ImageFormat::Png) {
            warn!("Failed to encode texture {} as PNG: {}", source.path.display(), e);
            return None;
        }
        let png = png.into_inner();

        let stem = source
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| source.name.clone());
        let view = self.push_view(&png, None, &stem);

        let image_idx = self.images.len() as u32;
        self.images.push(gltf_json::Image {
            name: Some(stem.clone()),
            buffer_view: Some(gltf_json::Index::new(view)),
            mime_type: Some(gltf_json::image::MimeType("image/png".to_string())),
            uri: None,
            extensions: None,
            extras: None,
        });

        if self.samplers.is_empty() {
            self.samplers.push(gltf_json::texture::Sampler {
                mag_filter: Some(Checked::Valid(gltf_json::texture::MagFilter::Linear)),
                min_filter: Some(Checked::Valid(
                    gltf_json::texture::MinFilter::LinearMipmapLinear,
                )),
                wrap_s: Checked::Valid(gltf_json::texture::WrappingMode::Repeat),
                wrap_t: Checked::Valid(gltf_json::texture::WrappingMode::Repeat),
                ..Default::default()
            });
        }

        let texture_idx = self.textures.len() as u32;
        self.textures.push(gltf_json::Texture {
            name: Some(stem),
            sampler: Some(gltf_json::Index::new(0)),
            source: gltf_json::Index::new(image_idx),
            extensions: None,
            extras: None,
        });
        Some(texture_idx)
    }

    fn material_for(&mut self, scene: &Scene, id: MaterialId) -> Option<u32> {
        if let Some(idx) = self.material_map.get(&id) {
            return Some(*idx);
        }
        let material = scene.material(id)?;
        let gltf_material = self.build_material(scene, material);
        let idx = self.materials.len() as u32;
        self.materials.push(gltf_material);
        self.material_map.insert(id, idx);
        Some(idx)
    }

    fn build_material(&mut self, scene: &Scene, material: &Material) -> gltf_json::Material {
        let (base_color, metallic, roughness) = match material.principled() {
            Some(bsdf) => (bsdf.base_color, bsdf.metallic, bsdf.roughness),
            None => {
                warn!("Material '{}' has no principled node; exporting defaults", material.name);
                ([0.8, 0.8, 0.8, 1.0], 0.0, 0.5)
            }
        };
        let tree = material.node_tree.as_ref();

        // Linked alpha comes from the texture; otherwise the constant applies.
        let alpha_linked = tree.map_or(false, |t| t.is_linked(PrincipledSocket::Alpha));
        let constant_alpha = material.principled().map_or(1.0, |b| b.alpha);
        let factor_alpha = if alpha_linked {
            base_color[3]
        } else {
            base_color[3] * constant_alpha
        };

        let base_color_texture = tree
            .and_then(|t| t.linked_image(PrincipledSocket::BaseColor))
            .filter(|(_, socket)| *socket == OutputSocket::Color)
            .and_then(|(image, _)| self.texture_for(scene, image))
            .map(|texture| gltf_json::texture::Info {
                index: gltf_json::Index::new(texture),
                tex_coord: 0,
                extensions: None,
                extras: None,
            });
        // A linked base color is multiplied by a white factor.
        let factor_rgb = if base_color_texture.is_some() {
            [1.0, 1.0, 1.0]
        } else {
            [base_color[0], base_color[1], base_color[2]]
        };

        let (alpha_mode, alpha_cutoff) = match material.blend_method {
            BlendMethod::Opaque => (gltf_json::material::AlphaMode::Opaque, None),
            BlendMethod::Clip => (
                gltf_json::material::AlphaMode::Mask,
                Some(gltf_json::material::AlphaCutoff(0.5)),
            ),
            BlendMethod::Blend => (gltf_json::material::AlphaMode::Blend, None),
        };

        gltf_json::Material {
            alpha_cutoff,
            alpha_mode: Checked::Valid(alpha_mode),
            double_sided: false,
            pbr_metallic_roughness: gltf_json::material::PbrMetallicRoughness {
                base_color_factor: gltf_json::material::PbrBaseColorFactor([
                    factor_rgb[0],
                    factor_rgb[1],
                    factor_rgb[2],
                    factor_alpha,
                ]),
                base_color_texture,
                metallic_factor: gltf_json::material::StrengthFactor(metallic),
                roughness_factor: gltf_json::material::StrengthFactor(roughness),
                metallic_roughness_texture: None,
                extensions: None,
                extras: None,
            },
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            emissive_factor: gltf_json::material::EmissiveFactor([0.0, 0.0, 0.0]),
            extensions: None,
            extras: None,
            name: Some(material.name.clone()),
        }
    }

    fn build_primitives(&mut self, scene: &Scene, mesh: &Mesh) -> Vec<gltf_json::mesh::Primitive> {
        let mut by_slot: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, face) in mesh.faces.iter().enumerate() {
            if face.vertices.len() >= 3 {
                by_slot.entry(face.material_index).or_default().push(i);
            }
        }

        let mut primitives = Vec::new();
        for (slot, face_indices) in by_slot {
            let faces: Vec<_> = face_indices.iter().map(|&i| &mesh.faces[i]).collect();
            // Joined meshes can mix mapped and unmapped faces; unmapped corners get (0, 0).
            let with_uvs = mesh.has_uv_layer && faces.iter().any(|f| !f.uvs.is_empty());
            let with_normals = faces.iter().all(|f| f.normals.len() == f.vertices.len());

            let mut positions: Vec<[f32; 3]> = Vec::new();
            let mut normals: Vec<f32> = Vec::new();
            let mut uvs: Vec<f32> = Vec::new();
            let mut indices: Vec<u32> = Vec::new();
            let mut lookup: HashMap<(u32, [u32; 2], [u32; 3]), u32> = HashMap::new();

            for face in &faces {
                for tri in face.triangle_corners() {
                    for corner in tri {
                        let v = face.vertices[corner];
                        let uv = if with_uvs {
                            face.uvs.get(corner).copied().unwrap_or([0.0, 0.0])
                        } else {
                            [0.0, 0.0]
                        };
                        let n = if with_normals { face.normals[corner] } else { [0.0, 0.0, 0.0] };
                        let key = (
                            v,
                            [uv[0].to_bits(), uv[1].to_bits()],
                            [n[0].to_bits(), n[1].to_bits(), n[2].to_bits()],
                        );
                        let index = *lookup.entry(key).or_insert_with(|| {
                            positions.push(mesh.positions[v as usize]);
                            if with_uvs {
                                // OBJ V runs bottom-up, glTF top-down
                                uvs.extend_from_slice(&[uv[0], 1.0 - uv[1]]);
                            }
                            if with_normals {
                                normals.extend_from_slice(&n);
                            }
                            (positions.len() - 1) as u32
                        });
                        indices.push(index);
                    }
                }
            }

            let prefix = format!("{}_s{}", mesh.name, slot);
            let (min, max) = match math::bounds(&positions) {
                Some(b) => b,
                None => continue,
            };
            let flat: Vec<f32> = positions.iter().flatten().copied().collect();
            let pos_acc = self.add_accessor_f32(
                &flat,
                &format!("{}_pos", prefix),
                gltf_json::accessor::Type::Vec3,
                3,
                Some(serde_json::json!(min)),
                Some(serde_json::json!(max)),
            );

            let mut attributes = BTreeMap::new();
            attributes.insert(
                Checked::Valid(gltf_json::mesh::Semantic::Positions),
                gltf_json::Index::new(pos_acc),
            );
            if with_normals {
                let acc = self.add_accessor_f32(
                    &normals,
                    &format!("{}_norm", prefix),
                    gltf_json::accessor::Type::Vec3,
                    3,
                    None,
                    None,
                );
                attributes.insert(
                    Checked::Valid(gltf_json::mesh::Semantic::Normals),
                    gltf_json::Index::new(acc),
                );
            }
            if with_uvs {
                let acc = self.add_accessor_f32(
                    &uvs,
                    &format!("{}_uv", prefix),
                    gltf_json::accessor::Type::Vec2,
                    2,
                    None,
                    None,
                );
                attributes.insert(
                    Checked::Valid(gltf_json::mesh::Semantic::TexCoords(0)),
                    gltf_json::Index::new(acc),
                );
            }
            let idx_acc = self.add_index_accessor(&indices, &format!("{}_idx", prefix));

            let material = mesh
                .materials
                .get(slot)
                .and_then(|id| self.material_for(scene, *id))
                .map(gltf_json::Index::new);

            primitives.push(gltf_json::mesh::Primitive {
                attributes,
                indices: Some(gltf_json::Index::new(idx_acc)),
                material,
                mode: Checked::Valid(gltf_json::mesh::Mode::Triangles),
                targets: None,
                extensions: None,
                extras: None,
            });
        }
        primitives
    }
}

/// Build the glTF JSON and the matching binary buffer for `scene`.
pub fn build_gltf(scene: &Scene) -> Result<(String, Vec<u8>)> {
    let mut builder = GltfBuilder::new();
    let mut root_nodes = Vec::new();

    for object in &scene.objects {
        let primitives = builder.build_primitives(scene, &object.mesh);
        let mesh = if primitives.is_empty() {
            None
        } else {
            let mesh_idx = builder.meshes.len() as u32;
            builder.meshes.push(gltf_json::Mesh {
                name: Some(object.mesh.name.clone()),
                primitives,
                weights: None,
                extensions: None,
                extras: None,
            });
            Some(gltf_json::Index::new(mesh_idx))
        };

        let node_idx = builder.nodes.len() as u32;
        builder.nodes.push(gltf_json::Node {
            mesh,
            name: Some(object.name.clone()),
            ..Default::default()
        });
        root_nodes.push(gltf_json::Index::new(node_idx));
    }

    let buffers = if builder.bin.is_empty() {
        Vec::new()
    } else {
        let pad = (4 - (builder.bin.len() % 4)) % 4;
        builder.bin.resize(builder.bin.len() + pad, 0);
        vec![gltf_json::Buffer {
            byte_length: USize64(builder.bin.len() as u64),
            extensions: None,
            extras: None,
            name: None,
            uri: None, // embedded in GLB
        }]
    };

    let root = gltf_json::Root {
        asset: gltf_json::Asset {
            version: "2.0".to_string(),
            generator: Some(GENERATOR.to_string()),
            ..Default::default()
        },
        nodes: builder.nodes,
        scenes: vec![gltf_json::Scene {
            nodes: root_nodes,
            name: Some("Scene".to_string()),
            extensions: None,
            extras: None,
        }],
        scene: Some(gltf_json::Index::new(0)),
        accessors: builder.accessors,
        buffers,
        buffer_views: builder.buffer_views,
        meshes: builder.meshes,
        materials: builder.materials,
        images: builder.images,
        samplers: builder.samplers,
        textures: builder.textures,
        ..Default::default()
    };

    let json = serde_json::to_string(&root)?;
    Ok((json, builder.bin))
}
