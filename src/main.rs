use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zone_glb_tools_lib::backend::ObjGlbBackend;
use zone_glb_tools_lib::config::{resolve_config, ConfigOverrides, DEFAULT_CONFIG_FILE};
use zone_glb_tools_lib::pipeline::batch::{run_batch, BatchReport};
use zone_glb_tools_lib::pipeline::AssetKind;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OnlyKind {
    Zones,
    Objects,
}

impl From<OnlyKind> for AssetKind {
    fn from(kind: OnlyKind) -> Self {
        match kind {
            OnlyKind::Zones => AssetKind::Zone,
            OnlyKind::Objects => AssetKind::Object,
        }
    }
}

#[derive(Parser)]
#[command(name = "zone-glb")]
#[command(about = "Convert exported zone and object OBJ files to GLB")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input root containing zones/ and objects/
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output root; zones/ and objects/ are created under it
    #[arg(long)]
    output: Option<PathBuf>,

    /// Convert only one kind
    #[arg(long, value_enum)]
    only: Option<OnlyKind>,

    /// Name of the merged zone object
    #[arg(long)]
    zone_name: Option<String>,

    /// Remove-doubles distance for zone merges
    #[arg(long)]
    merge_distance: Option<f32>,

    /// Write a JSON batch report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn overrides(cli: &Cli) -> ConfigOverrides {
    ConfigOverrides {
        input_root: cli.input.clone(),
        output_root: cli.output.clone(),
        kinds: cli.only.map(|only| vec![only.into()]),
        zone_object_name: cli.zone_name.clone(),
        merge_distance: cli.merge_distance,
    }
}

fn run(cli: Cli) -> Result<BatchReport> {
    let config = resolve_config(
        cli.config.as_deref(),
        Path::new(DEFAULT_CONFIG_FILE),
        overrides(&cli),
    )?;
    info!(
        "Converting {} -> {}",
        config.input_root.display(),
        config.output_root.display()
    );

    let mut backend = ObjGlbBackend::new();
    let report = run_batch(&mut backend, &config);

    info!(
        "Done: {} exported, {} skipped, {} failed, {} batch errors",
        report.exported(),
        report.skipped(),
        report.failed(),
        report.batch_errors.len()
    );

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(report)
}
