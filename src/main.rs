use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueHint};
use lumascan::config::{AnalyzerConfig, ContentionPolicy};
use lumascan::luma::LumaMode;
use lumascan::observability::{MetricsCollector, log_snapshot};
use lumascan::scheduler::BatchScheduler;
use lumascan::stats::{LumaAggregate, RunReport};
use lumascan::validation::validate_run;
use lumascan::video::raw::{LVR_EXTENSION, RawDecoder};
use serde_json::to_writer_pretty;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_tracing()?;
    run(cli)
}

fn configure_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    let report = validate_run(&cli.directory, cli.workers, &config);
    for warning in &report.warnings {
        warn!(directory = %cli.directory.display(), "{warning}");
    }
    if !report.is_ok() {
        for error_msg in &report.errors {
            error!(directory = %cli.directory.display(), "{error_msg}");
        }
        return Err(anyhow!(
            "Run validation failed with {} error(s)",
            report.errors.len()
        ));
    }

    let paths = collect_video_paths(&cli.directory)?;
    if paths.is_empty() {
        bail!(
            "No .{LVR_EXTENSION} files found in '{}'",
            cli.directory.display()
        );
    }
    info!(
        directory = %cli.directory.display(),
        inputs = paths.len(),
        workers = cli.workers,
        mode = ?config.mode,
        "Starting analysis"
    );

    let metrics = MetricsCollector::new();
    let decoder = Arc::new(RawDecoder::new());
    let scheduler = BatchScheduler::new(config, cli.workers, decoder, metrics.clone())?;
    let outcome = scheduler.run(&paths);

    let aggregate = LumaAggregate::collect(&outcome.scores);
    if aggregate.is_empty() {
        bail!("All {} clip(s) failed to analyze", outcome.failures.len());
    }
    let summary = aggregate.summary()?;

    println!(
        "Analyzed {}/{} clip(s) in {} batch(es)",
        outcome.scores.len(),
        paths.len(),
        outcome.batches
    );
    println!(
        "Min luminosity:    {:>3} ({})",
        summary.min.mean_luma, summary.min.label
    );
    println!(
        "Max luminosity:    {:>3} ({})",
        summary.max.mean_luma, summary.max.label
    );
    println!("Mean luminosity:   {:>3}", summary.mean_luma);
    println!(
        "Median luminosity: {:>3} ({})",
        summary.median.mean_luma, summary.median.label
    );

    let snapshot = metrics.snapshot();
    if cli.print_metrics {
        log_snapshot(&snapshot);
    }
    if let Some(path) = &cli.report_json {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create report directory: {}", parent.display())
            })?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        let run_report = RunReport {
            summary,
            scores: outcome.scores,
            failures: outcome.failures,
            metrics: snapshot,
        };
        to_writer_pretty(file, &run_report)
            .with_context(|| format!("Failed to write report JSON: {}", path.display()))?;
        info!(report = %path.display(), "Run report written");
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(policy) = cli.on_contention {
        config.on_contention = policy;
    }
    if let Some(ms) = cli.append_timeout_ms {
        config.append_timeout_ms = ms;
    }
    if let Some(ms) = cli.report_timeout_ms {
        config.report_timeout_ms = ms;
    }
    if let Some(quality) = cli.jpeg_quality {
        config.jpeg_quality = quality;
    }
    if let Some(dir) = &cli.save_frames {
        config.export_dir = Some(dir.clone());
    }
    Ok(config)
}

fn collect_video_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read video directory: {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(LVR_EXTENSION) => paths.push(path),
            _ => debug!(file = %path.display(), "Skipping non-video file"),
        }
    }
    paths.sort();
    Ok(paths)
}

#[derive(Parser)]
#[command(
    name = "lumascan",
    version,
    about = "Batch luminosity analysis for video files"
)]
struct Cli {
    /// Directory containing the videos to analyze.
    #[arg(value_hint = ValueHint::DirPath)]
    directory: PathBuf,
    /// Maximum number of workers running concurrently within a batch.
    workers: usize,
    /// Luminosity formula to score frames with.
    #[arg(long, value_enum)]
    mode: Option<LumaMode>,
    /// What a worker does when a guarded resource stays busy past its wait.
    #[arg(long = "on-contention", value_enum)]
    on_contention: Option<ContentionPolicy>,
    #[arg(long = "append-timeout-ms")]
    append_timeout_ms: Option<u64>,
    #[arg(long = "report-timeout-ms")]
    report_timeout_ms: Option<u64>,
    /// Optional YAML config; CLI flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also write every decoded frame as a JPEG under this directory.
    #[arg(long = "save-frames")]
    save_frames: Option<PathBuf>,
    #[arg(long = "jpeg-quality")]
    jpeg_quality: Option<u8>,
    /// Log the run metrics summary after the batch completes.
    #[arg(long)]
    print_metrics: bool,
    /// Write the full run report (summary, scores, failures, metrics) as JSON.
    #[arg(long = "report-json")]
    report_json: Option<PathBuf>,
}
