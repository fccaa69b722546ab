//! Batch scheduler.
//!
//! Inputs are processed in `ceil(files / cap)` sequential batches. Every
//! clip in a batch gets its own worker thread; the scheduler joins all of
//! them before the next batch starts, so at most `cap` workers are ever
//! alive and there is no work stealing across the barrier. A worker failure
//! is contained at the join: it is logged, counted and collected while its
//! siblings carry on.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::clip::Clip;
use crate::config::{AnalyzerConfig, MAX_WORKERS};
use crate::error::{Error, Result};
use crate::export;
use crate::observability::MetricsCollector;
use crate::reporter::{Reporter, ReporterHandle};
use crate::video::Decoder;

/// Outcome of one successfully analyzed clip.
#[derive(Debug, Clone, Serialize)]
pub struct ClipScore {
    pub input_index: usize,
    pub path: PathBuf,
    pub label: String,
    pub mean_luma: u32,
    pub frame_count: usize,
    pub plane_count: usize,
}

/// A contained worker failure.
#[derive(Debug, Clone, Serialize)]
pub struct ClipFailure {
    pub input_index: usize,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub scores: Vec<ClipScore>,
    pub failures: Vec<ClipFailure>,
    pub batches: usize,
}

pub struct BatchScheduler {
    config: AnalyzerConfig,
    cap: usize,
    decoder: Arc<dyn Decoder>,
    metrics: MetricsCollector,
}

impl BatchScheduler {
    /// Fails with a configuration error when the worker cap falls outside
    /// `1..=MAX_WORKERS`; nothing is scheduled in that case.
    pub fn new(
        config: AnalyzerConfig,
        cap: usize,
        decoder: Arc<dyn Decoder>,
        metrics: MetricsCollector,
    ) -> Result<Self> {
        if cap < 1 || cap > MAX_WORKERS {
            return Err(Error::Config(format!(
                "worker count {cap} outside the supported range 1..={MAX_WORKERS}"
            )));
        }
        Ok(Self {
            config,
            cap,
            decoder,
            metrics,
        })
    }

    #[instrument(skip(self, paths))]
    pub fn run(&self, paths: &[PathBuf]) -> RunOutcome {
        let run_start = Instant::now();
        let reporter = Reporter::start(
            self.config.on_contention,
            self.config.report_timeout(),
            self.metrics.clone(),
        );

        let batches = paths.len().div_ceil(self.cap);
        let mut scores = Vec::new();
        let mut failures = Vec::new();

        for (batch_index, chunk) in paths.chunks(self.cap).enumerate() {
            info!(
                batch = batch_index + 1,
                total_batches = batches,
                size = chunk.len(),
                "Dispatching batch"
            );

            let mut handles = Vec::with_capacity(chunk.len());
            for (slot, path) in chunk.iter().enumerate() {
                let input_index = batch_index * self.cap + slot;
                let job = ClipJob {
                    input_index,
                    path: path.clone(),
                    config: self.config.clone(),
                    decoder: self.decoder.clone(),
                    metrics: self.metrics.clone(),
                    reporter: reporter.handle(),
                };
                let spawned = thread::Builder::new()
                    .name(format!("luma-worker-{input_index}"))
                    .spawn(move || job.run());
                match spawned {
                    Ok(handle) => handles.push((input_index, path.clone(), handle)),
                    Err(err) => {
                        self.metrics.record_clip_failed();
                        error!(input = %path.display(), error = %err, "Failed to spawn worker");
                        failures.push(ClipFailure {
                            input_index,
                            path: path.clone(),
                            reason: format!("failed to spawn worker: {err}"),
                        });
                    }
                }
            }

            // The barrier: every worker of this batch finishes before the
            // next batch spawns.
            for (input_index, path, handle) in handles {
                match handle.join() {
                    Ok(Ok(score)) => {
                        self.metrics.record_clip_analyzed();
                        scores.push(score);
                    }
                    Ok(Err(err)) => {
                        self.metrics.record_clip_failed();
                        warn!(input = %path.display(), error = %err, "Clip analysis failed");
                        failures.push(ClipFailure {
                            input_index,
                            path,
                            reason: err.to_string(),
                        });
                    }
                    Err(_) => {
                        self.metrics.record_clip_failed();
                        error!(input = %path.display(), "Worker panicked");
                        failures.push(ClipFailure {
                            input_index,
                            path,
                            reason: "worker panicked".to_string(),
                        });
                    }
                }
            }
        }

        self.metrics.record_total_duration(run_start.elapsed());
        RunOutcome {
            scores,
            failures,
            batches,
        }
    }
}

struct ClipJob {
    input_index: usize,
    path: PathBuf,
    config: AnalyzerConfig,
    decoder: Arc<dyn Decoder>,
    metrics: MetricsCollector,
    reporter: ReporterHandle,
}

impl ClipJob {
    fn run(self) -> Result<ClipScore> {
        let label = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "clip".to_string());
        let result = self.analyze(&label);
        if let Err(err) = &result {
            let _ = self.reporter.clip_failed(&label, &err.to_string());
        }
        result
    }

    fn analyze(&self, label: &str) -> Result<ClipScore> {
        let _timer = self.metrics.start_clip(label);
        self.reporter.clip_started(label)?;

        let frames = self.decoder.decode(&self.path)?;

        if let Some(dir) = &self.config.export_dir {
            let target = dir.join(clip_stem(&self.path));
            match export::save_frames(&frames, &target, self.config.jpeg_quality) {
                Ok(saved) => self.metrics.record_frames_exported(saved.len() as u64),
                Err(err) => {
                    warn!(clip = label, error = %err, "Frame export failed");
                }
            }
        }

        let clip = Clip::new(
            self.path.clone(),
            self.config.on_contention,
            self.config.append_timeout(),
            self.metrics.clone(),
        );
        for frame in frames {
            clip.append_frame(frame)?;
        }
        let plane_count = clip.compute_luminosity(self.config.mode);
        let mean = clip.mean_luminosity();
        self.reporter.clip_mean(label, mean)?;

        Ok(ClipScore {
            input_index: self.input_index,
            path: self.path.clone(),
            label: label.to_string(),
            mean_luma: mean,
            frame_count: clip.frame_count(),
            plane_count,
        })
    }
}

fn clip_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "clip".to_string())
}
