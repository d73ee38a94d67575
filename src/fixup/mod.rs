//! Material and UV fixups applied to every imported scene before export.
//!
//! Both passes are idempotent: running them on an already fixed scene leaves
//! the materials and face assignments unchanged.

pub mod noclip;
pub mod transparency;

use serde::{Deserialize, Serialize};

use crate::error::MalformedMaterial;
use crate::scene::Scene;

pub use noclip::{ensure_noclip_material, noclip_material, tag_noclip_faces, NOCLIP_MATERIAL_NAME};
pub use transparency::fix_transparency;

/// Counts reported by [`apply_fixups`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixupSummary {
    pub transparent_materials_fixed: usize,
    pub noclip_faces: usize,
}

/// Run the transparency fix, then no-clip tagging.
pub fn apply_fixups(scene: &mut Scene, noclip_name: &str) -> Result<FixupSummary, MalformedMaterial> {
    let transparent_materials_fixed = fix_transparency(scene)?;
    let noclip_faces = tag_noclip_faces(scene, noclip_name);
    Ok(FixupSummary {
        transparent_materials_fixed,
        noclip_faces,
    })
}
