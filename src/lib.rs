pub mod backend;
pub mod config;
pub mod error;
pub mod fixup;
pub mod math;
pub mod pipeline;
pub mod scene;

pub use backend::{ObjGlbBackend, SceneBackend};
pub use config::{load_config, ConvertConfig};
pub use error::{ConvertError, MalformedMaterial};
pub use pipeline::batch::{run_batch, BatchReport};
pub use pipeline::{convert, AssetKind, ConversionOutcome, PipelineOptions};
