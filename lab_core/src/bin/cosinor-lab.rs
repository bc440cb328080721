//! CosinorAge lab command-line client
//!
//! Uploads a batch of recordings to the analysis service, configures and
//! submits it, and prints the batch analytics as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Accelerometer batch with default column detection
//! cosinor-lab run --data-type accelerometer --unit g --timestamp-format datetime a.csv b.csv
//!
//! # Only check that the files share one schema
//! cosinor-lab check a.csv b.csv
//! ```
//!
//! # Environment Variables
//!
//! - `COSINOR_API_URL`: Base URL of the analysis service
//! - `COSINOR_TIMEOUT_SECS`: Request timeout in seconds
//! - `RUST_LOG`: Log filter (default: info)

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use futures::future::try_join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cosinor_lab::api::{FailedFile, FailedHandler};
use cosinor_lab::models::{DataType, DataUnit, Gender, TimestampFormat};
use cosinor_lab::remote::{AnalysisService, HttpAnalysisService, LabConfig, ProgressFn, UploadSource};
use cosinor_lab::services::{
    BatchController, BatchOutcome, FeatureDistributions, Heatmap, OrderSource,
};

#[derive(Debug, Parser)]
#[command(name = "cosinor-lab", version, about = "Multi-individual CosinorAge lab client")]
struct Cli {
    /// Configuration file (default: cosinor-lab.toml in the usual locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload, configure and process a batch
    Run(RunArgs),
    /// Upload a batch and report whether the files share one schema
    Check(CheckArgs),
    /// Drop every upload held by the service
    Clear,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[arg(long)]
    data_type: DataType,

    /// mg, g or m/s² (not used for alternative_count)
    #[arg(long)]
    unit: Option<DataUnit>,

    /// datetime, unix-s or unix-ms
    #[arg(long)]
    timestamp_format: TimestampFormat,

    /// Time column (default: detected from the column names)
    #[arg(long)]
    time_column: Option<String>,

    #[arg(long)]
    x: Option<String>,

    #[arg(long)]
    y: Option<String>,

    #[arg(long)]
    z: Option<String>,

    /// Data columns for enmo / alternative_count (repeatable)
    #[arg(long = "column")]
    columns: Vec<String>,

    /// Request the biological-age estimate
    #[arg(long, default_value_t = false)]
    cosinorage: bool,

    /// Age per file, in file order (repeatable)
    #[arg(long = "age")]
    ages: Vec<String>,

    /// Gender per file, in file order: male, female or unknown (repeatable)
    #[arg(long = "gender")]
    genders: Vec<Gender>,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Leave the uploads on the service after the run
    #[arg(long, default_value_t = false)]
    keep: bool,
}

#[derive(Serialize)]
struct RunReport {
    state: String,
    message: Option<String>,
    outcome: Option<BatchOutcome>,
    failed_files: Vec<FailedFile>,
    failed_handlers: Vec<FailedHandler>,
    feature_order: Option<OrderSource>,
    distributions: Option<FeatureDistributions>,
    heatmap: Option<Heatmap>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_logger() -> ProgressFn {
    Arc::new(|percent: f64| debug!("Upload progress {:.0}%", percent))
}

async fn read_sources(paths: &[PathBuf]) -> anyhow::Result<Vec<UploadSource>> {
    let sources = try_join_all(paths.iter().map(UploadSource::from_path))
        .await
        .context("Failed to read input files")?;
    Ok(sources)
}

async fn check(service: Arc<HttpAnalysisService>, config: &LabConfig, args: CheckArgs) -> anyhow::Result<()> {
    let mut controller = BatchController::from_config(service, config);
    let sources = read_sources(&args.files).await?;
    let valid = controller.upload(sources, progress_logger()).await.is_ok();
    let verdict = serde_json::json!({
        "valid": valid,
        "state": controller.state().name(),
        "message": controller.last_error().or(controller.last_message()),
        "columns": controller.columns(),
    });
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    controller.reset().await;
    Ok(())
}

async fn run(service: Arc<HttpAnalysisService>, config: &LabConfig, args: RunArgs) -> anyhow::Result<()> {
    let mut controller = BatchController::from_config(service, config);
    let sources = read_sources(&args.files).await?;

    controller
        .upload(sources, progress_logger())
        .await
        .context("Upload rejected")?;

    let mut draft = controller.apply_default_columns(args.data_type)?;
    draft.data_unit = args.unit;
    draft.timestamp_format = Some(args.timestamp_format);
    if let Some(time_column) = args.time_column {
        draft.time_column = Some(time_column);
    }
    if args.x.is_some() || args.y.is_some() || args.z.is_some() {
        draft.x_column = args.x;
        draft.y_column = args.y;
        draft.z_column = args.z;
    }
    if !args.columns.is_empty() {
        draft.data_columns = args.columns;
    }
    controller.configure(draft).context("Incomplete batch configuration")?;

    if args.cosinorage {
        controller.enable_cosinorage(true);
        let files = controller.files().to_vec();
        if args.ages.len() > files.len() || args.genders.len() > files.len() {
            bail!("More ages or genders given than files uploaded");
        }
        for (file, age) in files.iter().zip(&args.ages) {
            controller.set_age(&file.file_id, age.as_str())?;
        }
        for (file, gender) in files.iter().zip(&args.genders) {
            controller.set_gender(&file.file_id, Some(*gender))?;
        }
    }

    let submitted = controller.submit().await;
    if let Err(e) = &submitted {
        warn!(error = %e, "Batch did not complete");
    }

    let distributions = controller.distributions();
    let report = RunReport {
        state: controller.state().name().to_string(),
        message: controller
            .last_message()
            .or(controller.last_error())
            .map(str::to_string),
        outcome: submitted.as_ref().ok().cloned(),
        failed_files: controller
            .result()
            .map(|r| r.failed_files.clone())
            .unwrap_or_default(),
        failed_handlers: controller
            .result()
            .map(|r| r.failed_handlers.clone())
            .unwrap_or_default(),
        feature_order: distributions.as_ref().map(|d| d.source),
        distributions,
        heatmap: controller.heatmap(),
    };
    write_report(&report, args.output.as_deref())?;

    if !args.keep {
        controller.reset().await;
    }
    submitted?;
    Ok(())
}

fn write_report(report: &RunReport, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = LabConfig::load(cli.config.as_deref())?;
    info!(api = %config.service.api_base_url, "Using analysis service");
    let service = Arc::new(HttpAnalysisService::new(config.clone())?);

    match cli.command {
        Commands::Run(args) => run(service, &config, args).await,
        Commands::Check(args) => check(service, &config, args).await,
        Commands::Clear => {
            service.clear_all_state().await?;
            info!("Service state cleared");
            Ok(())
        }
    }
}
