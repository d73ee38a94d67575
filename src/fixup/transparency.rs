use tracing::debug;

use crate::error::MalformedMaterial;
use crate::scene::Scene;

/// Detach every input of fully transparent principled nodes.
///
/// glTF exporters read the constant base color / alpha of the principled
/// node and ignore alpha driven through links, so a material whose alpha
/// constant is exactly `0.0` is reduced to constants: all links into the
/// node are removed and the base color alpha is forced to `0.0`.
///
/// Returns the number of materials that were changed. Fails on the first
/// material without a principled node.
pub fn fix_transparency(scene: &mut Scene) -> Result<usize, MalformedMaterial> {
    let mut fixed = 0;

    for material in scene.materials.iter_mut() {
        let name = material.name.clone();
        let malformed = || MalformedMaterial {
            material: name.clone(),
        };

        let tree = material.node_tree.as_mut().ok_or_else(malformed)?;
        let bsdf_index = tree.principled_index().ok_or_else(malformed)?;

        let alpha = tree.principled_node().map(|b| b.alpha).ok_or_else(malformed)?;
        if alpha != 0.0 {
            continue;
        }

        let removed = tree.unlink_inputs(bsdf_index);
        let bsdf = tree.principled_node_mut().ok_or_else(malformed)?;
        let changed = removed > 0 || bsdf.base_color[3] != 0.0;
        bsdf.base_color[3] = 0.0;

        if changed {
            debug!("Fixed transparency of material '{}' ({} links removed)", name, removed);
            fixed += 1;
        }
    }

    Ok(fixed)
}
