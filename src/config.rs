//! Batch configuration: TOML file values, CLI overrides, defaults.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::{AssetKind, PipelineOptions};

/// Default input root: where the OBJ extractor writes `zones/` and `objects/`.
pub const DEFAULT_INPUT_ROOT: &str = "export";
pub const DEFAULT_OUTPUT_ROOT: &str = "glb";
pub const DEFAULT_SOURCE_EXTENSION: &str = "obj";
pub const DEFAULT_ZONE_OBJECT_NAME: &str = "Geo-col";
/// Host default merge distance for remove-doubles.
pub const DEFAULT_MERGE_DISTANCE: f32 = 0.0001;
/// Config file picked up from the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "zone-glb.toml";

/// Raw config file contents; every field is optional.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    pub input_root: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub kinds: Option<Vec<AssetKind>>,
    pub source_extension: Option<String>,
    pub pipeline: Option<PipelineSection>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PipelineSection {
    pub zone_object_name: Option<String>,
    pub noclip_material_name: Option<String>,
    pub merge_distance: Option<f32>,
}

/// Resolved configuration handed to the batch runner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertConfig {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    /// Kinds to convert, in order.
    pub kinds: Vec<AssetKind>,
    /// Source file extension without the dot, compared case-insensitively.
    pub source_extension: String,
    pub pipeline: PipelineOptions,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from(DEFAULT_INPUT_ROOT),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            kinds: vec![AssetKind::Zone, AssetKind::Object],
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            pipeline: PipelineOptions::default(),
        }
    }
}

impl ConvertConfig {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    /// Overlay file values on the defaults.
    pub fn from_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();
        if let Some(input_root) = file.input_root {
            config.input_root = input_root;
        }
        if let Some(output_root) = file.output_root {
            config.output_root = output_root;
        }
        if let Some(kinds) = file.kinds {
            config.kinds = kinds;
        }
        if let Some(ext) = file.source_extension {
            config.source_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(pipeline) = file.pipeline {
            if let Some(name) = pipeline.zone_object_name {
                config.pipeline.zone_object_name = name;
            }
            if let Some(name) = pipeline.noclip_material_name {
                config.pipeline.noclip_material_name = name;
            }
            if let Some(distance) = pipeline.merge_distance {
                config.pipeline.merge_distance = distance;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kinds.is_empty() {
            bail!("No asset kinds selected");
        }
        if !(self.pipeline.merge_distance >= 0.0) {
            bail!("merge_distance must be >= 0, got {}", self.pipeline.merge_distance);
        }
        if self.pipeline.zone_object_name.is_empty() {
            bail!("zone_object_name must not be empty");
        }
        if self.pipeline.noclip_material_name.is_empty() {
            bail!("noclip_material_name must not be empty");
        }
        Ok(())
    }

    pub fn source_dir(&self, kind: AssetKind) -> PathBuf {
        self.input_root.join(kind.dir_name())
    }

    pub fn output_dir(&self, kind: AssetKind) -> PathBuf {
        self.output_root.join(kind.dir_name())
    }
}

/// Read a TOML config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ConvertConfig> {
    if !path.exists() {
        return Ok(ConvertConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file as TOML: {}", path.display()))?;
    ConvertConfig::from_file(file)
}

/// Command-line values; each one set takes precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_root: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub kinds: Option<Vec<AssetKind>>,
    pub zone_object_name: Option<String>,
    pub merge_distance: Option<f32>,
}

/// Load the named config file, which must exist, or else `default_path`
/// when present, then apply `overrides` and validate the result.
pub fn resolve_config(
    explicit: Option<&Path>,
    default_path: &Path,
    overrides: ConfigOverrides,
) -> Result<ConvertConfig> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            load_config(path)?
        }
        None => load_config(default_path)?,
    };

    if let Some(input_root) = overrides.input_root {
        config.input_root = input_root;
    }
    if let Some(output_root) = overrides.output_root {
        config.output_root = output_root;
    }
    if let Some(kinds) = overrides.kinds {
        config.kinds = kinds;
    }
    if let Some(name) = overrides.zone_object_name {
        config.pipeline.zone_object_name = name;
    }
    if let Some(distance) = overrides.merge_distance {
        config.pipeline.merge_distance = distance;
    }
    config.validate()?;
    Ok(config)
}
