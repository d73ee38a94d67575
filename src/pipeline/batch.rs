//! Directory walker: converts every source file under `zones/` and
//! `objects/` of the input root into mirrored output directories.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{convert, AssetKind, ConversionOutcome};
use crate::backend::SceneBackend;
use crate::config::ConvertConfig;
use crate::error::ConvertError;

/// Extension of every written file.
pub const OUTPUT_EXTENSION: &str = "glb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub path: PathBuf,
    /// Category from [`ConvertError::kind`].
    pub kind: String,
    pub message: String,
}

impl From<&ConvertError> for ErrorRecord {
    fn from(err: &ConvertError) -> Self {
        // Include the source chain, the top-level message alone hides the cause.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        Self {
            path: err.path().to_path_buf(),
            kind: err.kind().to_string(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub kind: AssetKind,
    pub input: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ConversionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

/// Result of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub files: Vec<FileRecord>,
    /// Failures that prevented a whole kind from running.
    pub batch_errors: Vec<ErrorRecord>,
}

impl BatchReport {
    pub fn exported(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, Some(ConversionOutcome::Exported(_))))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, Some(ConversionOutcome::Skipped { .. })))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }

    /// No per-file or batch-level failures.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.batch_errors.is_empty()
    }
}

/// Source files in `dir` with the given extension, sorted by path.
pub fn list_sources(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ConvertError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConvertError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ConvertError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case(extension));
        if matches {
            files.push(path);
        } else {
            debug!("Ignoring {}", path.display());
        }
    }

    files.sort();
    Ok(files)
}

/// `<output_dir>/<input stem>.glb`
pub fn output_path_for(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output_dir.join(format!("{}.{}", stem, OUTPUT_EXTENSION))
}

/// Convert every configured kind. Per-file failures are recorded and the
/// batch continues.
pub fn run_batch<B: SceneBackend + ?Sized>(backend: &mut B, config: &ConvertConfig) -> BatchReport {
    let mut report = BatchReport::default();

    for &kind in &config.kinds {
        let tag = kind.dir_name();
        let source_dir = config.source_dir(kind);
        let output_dir = config.output_dir(kind);

        let sources = match list_sources(&source_dir, &config.source_extension) {
            Ok(sources) => sources,
            Err(e) => {
                warn!("[{}] Cannot list {}: {}", tag, source_dir.display(), e);
                report.batch_errors.push(ErrorRecord::from(&e));
                continue;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            let err = ConvertError::io(&output_dir, e);
            warn!("[{}] {}", tag, err);
            report.batch_errors.push(ErrorRecord::from(&err));
            continue;
        }

        info!("[{}] Converting {} files from {}", tag, sources.len(), source_dir.display());

        let (mut exported, mut skipped, mut failed) = (0u32, 0u32, 0u32);
        for input in sources {
            let output = output_path_for(&output_dir, &input);
            debug!("[{}] {} -> {}", tag, input.display(), output.display());

            let record = match convert(backend, &input, &output, kind, &config.pipeline) {
                Ok(outcome) => {
                    match &outcome {
                        ConversionOutcome::Exported(_) => exported += 1,
                        ConversionOutcome::Skipped { .. } => skipped += 1,
                    }
                    FileRecord {
                        kind,
                        input,
                        outcome: Some(outcome),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("[{}] {}", tag, e);
                    failed += 1;
                    FileRecord {
                        kind,
                        input,
                        outcome: None,
                        error: Some(ErrorRecord::from(&e)),
                    }
                }
            };
            report.files.push(record);
        }

        info!(
            "[{}] {} exported, {} skipped, {} failed",
            tag, exported, skipped, failed
        );
    }

    report
}
