//! Per-file conversion: reset, import, guard, fix up, merge, export.

pub mod batch;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::SceneBackend;
use crate::config::{DEFAULT_MERGE_DISTANCE, DEFAULT_ZONE_OBJECT_NAME};
use crate::error::{ConvertError, Result};
use crate::fixup::{self, NOCLIP_MATERIAL_NAME};

/// Zones are merged into a single collision mesh; objects export as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    #[serde(rename = "zones")]
    Zone,
    #[serde(rename = "objects")]
    Object,
}

impl AssetKind {
    /// Subdirectory name under the input and output roots.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Zone => "zones",
            AssetKind::Object => "objects",
        }
    }

    pub fn is_zone(self) -> bool {
        self == AssetKind::Zone
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Name given to the merged zone object.
    pub zone_object_name: String,
    pub noclip_material_name: String,
    /// Remove-doubles distance for zone merges.
    pub merge_distance: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            zone_object_name: DEFAULT_ZONE_OBJECT_NAME.to_string(),
            noclip_material_name: NOCLIP_MATERIAL_NAME.to_string(),
            merge_distance: DEFAULT_MERGE_DISTANCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The import produced no vertices.
    EmptyImport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub output: PathBuf,
    pub vertex_count: usize,
    pub face_count: usize,
    pub transparent_materials_fixed: usize,
    pub noclip_faces: usize,
    /// Vertices removed by the zone merge; `None` for objects.
    pub merged_vertices: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Exported(ConversionStats),
    Skipped { reason: SkipReason },
}

fn scene_error(path: &Path, err: anyhow::Error) -> ConvertError {
    ConvertError::Scene {
        path: path.to_path_buf(),
        source: err.into(),
    }
}

/// Convert one source file.
///
/// Returns `Skipped` without writing anything when the import has no
/// vertices. A malformed material fails this file only.
pub fn convert<B: SceneBackend + ?Sized>(
    backend: &mut B,
    input: &Path,
    output: &Path,
    kind: AssetKind,
    options: &PipelineOptions,
) -> Result<ConversionOutcome> {
    backend.clear().map_err(|e| scene_error(input, e))?;

    backend.import(input).map_err(|e| ConvertError::Import {
        path: input.to_path_buf(),
        source: e.into(),
    })?;

    let vertex_count = backend.vertex_count();
    if vertex_count == 0 {
        info!("Skipping {}: no vertices after import", input.display());
        return Ok(ConversionOutcome::Skipped {
            reason: SkipReason::EmptyImport,
        });
    }

    let summary = fixup::apply_fixups(backend.scene_mut(), &options.noclip_material_name)
        .map_err(|source| ConvertError::MalformedMaterial {
            path: input.to_path_buf(),
            source,
        })?;
    debug!(
        "{}: {} transparent materials fixed, {} no-clip faces",
        input.display(),
        summary.transparent_materials_fixed,
        summary.noclip_faces
    );

    let merged_vertices = if kind.is_zone() {
        backend.scene_mut().active_object = Some(0);
        let joined = backend.join_all().map_err(|e| scene_error(input, e))?;
        let removed = backend
            .remove_doubles(options.merge_distance)
            .map_err(|e| scene_error(input, e))?;
        backend
            .scene_mut()
            .rename_object(joined, &options.zone_object_name)
            .map_err(|e| scene_error(input, e))?;
        debug!("{}: merged zone, {} duplicate vertices removed", input.display(), removed);
        Some(removed)
    } else {
        None
    };

    let face_count = backend.scene().statistics().faces;

    backend.export(output).map_err(|e| ConvertError::Export {
        path: output.to_path_buf(),
        source: e.into(),
    })?;

    Ok(ConversionOutcome::Exported(ConversionStats {
        output: output.to_path_buf(),
        vertex_count,
        face_count,
        transparent_materials_fixed: summary.transparent_materials_fixed,
        noclip_faces: summary.noclip_faces,
        merged_vertices,
    }))
}
