use tracing::debug;

use crate::scene::{BlendMethod, Material, MaterialId, PrincipledBsdf, Scene};

/// Name of the material assigned to faces with degenerate UVs.
pub const NOCLIP_MATERIAL_NAME: &str = "NOCLIP";

/// Placeholder slot given to slot-less meshes before the no-clip slot is
/// appended, so their other faces keep rendering.
pub const DEFAULT_MATERIAL_NAME: &str = "Material";

/// A fully transparent, alpha-blended material.
pub fn noclip_material(name: &str) -> Material {
    let mut material = Material::with_bsdf(
        name,
        PrincipledBsdf {
            base_color: [0.8, 0.8, 0.8, 0.0],
            alpha: 0.0,
            ..Default::default()
        },
    );
    material.blend_method = BlendMethod::Blend;
    material
}

/// Find the no-clip material by name, creating it when missing.
pub fn ensure_noclip_material(scene: &mut Scene, name: &str) -> MaterialId {
    match scene.find_material(name) {
        Some(id) => id,
        None => scene.add_material(noclip_material(name)),
    }
}

fn ensure_default_material(scene: &mut Scene) -> MaterialId {
    match scene.find_material(DEFAULT_MATERIAL_NAME) {
        Some(id) => id,
        None => scene.add_material(Material::new(DEFAULT_MATERIAL_NAME)),
    }
}

/// Assign the no-clip material to every face whose UV triangle has zero area.
///
/// The material is created on the first degenerate face, so a scene without
/// any gains nothing. Meshes without a UV layer are skipped. Returns the
/// number of faces that now point at the no-clip material.
pub fn tag_noclip_faces(scene: &mut Scene, material_name: &str) -> usize {
    let mut noclip: Option<MaterialId> = scene.find_material(material_name);
    let mut tagged = 0;

    for index in 0..scene.objects.len() {
        if !scene.objects[index].mesh.has_uv_layer {
            debug!("Skipping no-clip pass for '{}': no UV layer", scene.objects[index].name);
            continue;
        }

        let degenerate: Vec<usize> = scene.objects[index]
            .mesh
            .faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.uv_area() == Some(0.0))
            .map(|(i, _)| i)
            .collect();
        if degenerate.is_empty() {
            continue;
        }

        let id = *noclip.get_or_insert_with(|| ensure_noclip_material(scene, material_name));
        if scene.objects[index].mesh.materials.is_empty() {
            let default = ensure_default_material(scene);
            scene.objects[index].mesh.materials.push(default);
        }
        let mesh = &mut scene.objects[index].mesh;
        let slot = mesh.ensure_material_slot(id);
        for face in degenerate {
            mesh.faces[face].material_index = slot;
        }
        tagged += mesh.faces.iter().filter(|f| f.material_index == slot).count();
    }

    tagged
}
