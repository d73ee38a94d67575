use std::io;
use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A material that lacks the principled node the fixup passes operate on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("material '{material}' has no principled BSDF node")]
pub struct MalformedMaterial {
    pub material: String,
}

/// Per-file conversion error.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Filesystem error on a specific path.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backend could not import the source file.
    #[error("failed to import {}: {source}", .path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The backend could not write the output file.
    #[error("failed to export {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A scene operation (reset, join) failed.
    #[error("scene operation failed for {}: {source}", .path.display())]
    Scene {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A material in the imported scene is malformed.
    #[error("malformed input {}: {source}", .path.display())]
    MalformedMaterial {
        path: PathBuf,
        #[source]
        source: MalformedMaterial,
    },
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }

    /// Path of the file or directory the error is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ConvertError::Io { path, .. }
            | ConvertError::Import { path, .. }
            | ConvertError::Export { path, .. }
            | ConvertError::Scene { path, .. }
            | ConvertError::MalformedMaterial { path, .. } => path,
        }
    }

    /// Short machine-readable category, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::Io { .. } => "io",
            ConvertError::Import { .. } => "import",
            ConvertError::Export { .. } => "export",
            ConvertError::Scene { .. } => "scene",
            ConvertError::MalformedMaterial { .. } => "malformed_material",
        }
    }
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
