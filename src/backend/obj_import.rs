//! Wavefront OBJ/MTL import into a [`Scene`] via `tobj`.
//!
//! Each `tobj` model becomes one scene object. Materials are built the way a
//! DCC importer builds them: a principled BSDF with the MTL diffuse color and
//! dissolve, an image texture node for `map_Kd` driving the base color, and
//! (when the material is translucent) the texture alpha driving the alpha
//! input.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::scene::material::{OutputSocket, ShaderNodeKind};
use crate::scene::{
    BlendMethod, Face, ImageId, Material, MaterialId, Mesh, PrincipledBsdf, PrincipledSocket,
    Scene,
};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: false,  // keep polygons, the exporter fans them
        single_index: false, // positions stay shared between faces
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Import an OBJ file (and its MTL libraries) into `scene`.
///
/// A missing or unreadable MTL is logged and the geometry is imported
/// without materials.
pub fn import_obj(scene: &mut Scene, path: &Path) -> Result<()> {
    let (models, materials) = tobj::load_obj(path, &load_options())
        .with_context(|| format!("Failed to parse OBJ file: {}", path.display()))?;

    let materials = match materials {
        Ok(materials) => materials,
        Err(e) => {
            warn!("No materials loaded for {}: {}", path.display(), e);
            Vec::new()
        }
    };

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut images: HashMap<PathBuf, ImageId> = HashMap::new();
    let mut material_ids: Vec<MaterialId> = Vec::with_capacity(materials.len());
    for source in &materials {
        let material = convert_material(scene, source, &base_dir, &mut images);
        material_ids.push(scene.add_material(material));
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "object".to_string());

    // tobj starts a model on every `g`/`usemtl` as well as `o`; objects are
    // rebuilt from the `o` blocks so each keeps its name and material slots.
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read OBJ file: {}", path.display()))?;
    let blocks = scan_object_blocks(&String::from_utf8_lossy(&raw), &stem);

    let mut objects: Vec<Mesh> = Vec::new();
    let mut block = 0usize;
    let mut filled = 0usize;
    for (i, model) in models.iter().enumerate() {
        let part = convert_mesh(&model.name, &model.mesh, &material_ids).with_context(|| {
            format!("Invalid geometry in model '{}' of {}", model.name, path.display())
        })?;

        match blocks.get(block) {
            Some(target) => {
                if filled == 0 {
                    objects.push(Mesh::new(&target.name));
                }
                if let Some(mesh) = objects.last_mut() {
                    mesh.append(part);
                }
                filled += model_face_count(&model.mesh);
                if filled >= target.faces {
                    block += 1;
                    filled = 0;
                }
            }
            None => {
                warn!(
                    "{}: model '{}' has no matching object block, importing it separately",
                    path.display(),
                    model.name
                );
                let mut mesh = Mesh::new(&format!("{}_{}", stem, i));
                mesh.append(part);
                objects.push(mesh);
            }
        }
    }

    for mut mesh in objects {
        let welded = weld_identical_positions(&mut mesh);
        if welded > 0 {
            debug!("'{}': {} shared group vertices welded", mesh.name, welded);
        }
        let name = mesh.name.clone();
        scene.add_object(&name, mesh);
    }

    debug!(
        "Imported {}: {} objects, {} materials, {} images",
        path.display(),
        scene.objects.len(),
        scene.materials.len(),
        scene.images.len()
    );
    Ok(())
}

/// An `o` block of the source file and the number of `f` records in it.
#[derive(Debug, Clone, PartialEq)]
struct ObjectBlock {
    name: String,
    faces: usize,
}

/// Collect `o` names and face counts. Faces before the first `o` belong to
/// an object named after the file. Blocks without faces are dropped, as
/// tobj drops empty models.
fn scan_object_blocks(source: &str, stem: &str) -> Vec<ObjectBlock> {
    let mut blocks = vec![ObjectBlock {
        name: stem.to_string(),
        faces: 0,
    }];

    for line in source.lines() {
        let mut tokens = line.trim_start().splitn(2, char::is_whitespace);
        match tokens.next() {
            Some("o") => {
                let name = tokens.next().map(str::trim).unwrap_or_default();
                let name = if name.is_empty() {
                    format!("{}_{}", stem, blocks.len())
                } else {
                    name.to_string()
                };
                blocks.push(ObjectBlock { name, faces: 0 });
            }
            Some("f") => {
                if let Some(current) = blocks.last_mut() {
                    current.faces += 1;
                }
            }
            _ => {}
        }
    }

    blocks.retain(|b| b.faces > 0);
    blocks
}

fn model_face_count(mesh: &tobj::Mesh) -> usize {
    if mesh.face_arities.is_empty() {
        mesh.indices.len() / 3
    } else {
        mesh.face_arities.len()
    }
}

/// Collapse bit-identical positions. tobj reindexes positions per model, so
/// a vertex shared by two groups of one object arrives once per group.
/// Faces are only remapped, never dropped. Returns the number removed.
fn weld_identical_positions(mesh: &mut Mesh) -> usize {
    let mut seen: HashMap<[u32; 3], u32> = HashMap::new();
    let mut kept: Vec<[f32; 3]> = Vec::with_capacity(mesh.positions.len());
    let remap: Vec<u32> = mesh
        .positions
        .iter()
        .map(|p| {
            let key = [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()];
            *seen.entry(key).or_insert_with(|| {
                kept.push(*p);
                (kept.len() - 1) as u32
            })
        })
        .collect();

    let removed = mesh.positions.len() - kept.len();
    mesh.positions = kept;
    for face in mesh.faces.iter_mut() {
        for v in face.vertices.iter_mut() {
            *v = remap[*v as usize];
        }
    }
    removed
}

fn convert_material(
    scene: &mut Scene,
    source: &tobj::Material,
    base_dir: &Path,
    images: &mut HashMap<PathBuf, ImageId>,
) -> Material {
    let diffuse = source.diffuse.unwrap_or([0.8, 0.8, 0.8]);
    let alpha = source.dissolve.unwrap_or(1.0);

    let mut material = Material::with_bsdf(
        &source.name,
        PrincipledBsdf {
            base_color: [diffuse[0], diffuse[1], diffuse[2], 1.0],
            alpha,
            ..Default::default()
        },
    );
    if alpha < 1.0 {
        material.blend_method = BlendMethod::Blend;
    }

    let texture = source
        .diffuse_texture
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(texture) = texture {
        let image_path = base_dir.join(texture.replace('\\', "/"));
        let image = *images.entry(image_path.clone()).or_insert_with(|| {
            let name = image_path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| texture.to_string());
            scene.add_image(&name, image_path.clone())
        });

        if let Some(tree) = material.node_tree.as_mut() {
            let node = tree.add_node("Image Texture", ShaderNodeKind::ImageTexture { image });
            tree.link_image(node, OutputSocket::Color, PrincipledSocket::BaseColor);
            if alpha < 1.0 {
                tree.link_image(node, OutputSocket::Alpha, PrincipledSocket::Alpha);
            }
        }
    }

    material
}

fn convert_mesh(name: &str, source: &tobj::Mesh, material_ids: &[MaterialId]) -> Result<Mesh> {
    let mut mesh = Mesh::new(name);
    mesh.positions = source
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();

    if let Some(id) = source.material_id.and_then(|i| material_ids.get(i)) {
        mesh.materials.push(*id);
    }

    let has_uvs = !source.texcoords.is_empty()
        && source.texcoord_indices.len() == source.indices.len();
    let has_normals =
        !source.normals.is_empty() && source.normal_indices.len() == source.indices.len();
    mesh.has_uv_layer = has_uvs;

    let arities: Vec<usize> = if source.face_arities.is_empty() {
        vec![3; source.indices.len() / 3]
    } else {
        source.face_arities.iter().map(|&a| a as usize).collect()
    };

    let mut start = 0usize;
    for arity in arities {
        let end = start + arity;
        let vertices = source
            .indices
            .get(start..end)
            .ok_or_else(|| anyhow!("face {}..{} exceeds index buffer", start, end))?
            .to_vec();
        if let Some(bad) = vertices.iter().find(|&&v| v as usize >= mesh.positions.len()) {
            return Err(anyhow!("vertex index {} out of range", bad));
        }

        let uvs = if has_uvs {
            source.texcoord_indices[start..end]
                .iter()
                .map(|&t| {
                    let t = t as usize * 2;
                    match source.texcoords.get(t..t + 2) {
                        Some(uv) => Ok([uv[0], uv[1]]),
                        None => Err(anyhow!("texcoord index {} out of range", t / 2)),
                    }
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let normals = if has_normals {
            source.normal_indices[start..end]
                .iter()
                .map(|&n| {
                    let n = n as usize * 3;
                    match source.normals.get(n..n + 3) {
                        Some(v) => Ok([v[0], v[1], v[2]]),
                        None => Err(anyhow!("normal index {} out of range", n / 3)),
                    }
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        if arity >= 3 {
            mesh.faces.push(Face {
                vertices,
                uvs,
                normals,
                material_index: 0,
            });
        }
        start = end;
    }

    Ok(mesh)
}
