//! Serializing progress reporter.
//!
//! Worker threads never write progress lines themselves. They hand report
//! lines to a dedicated actor thread over a bounded channel, so output from
//! concurrent workers is serialized in arrival order and a stalled consumer
//! shows up as channel back-pressure instead of interleaved lines. A full
//! channel is handled per the configured [`ContentionPolicy`], mirroring how
//! clip appends treat a held lock.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, SendTimeoutError, bounded};
use tracing::{info, warn};

use crate::config::ContentionPolicy;
use crate::error::{Error, Result};
use crate::observability::MetricsCollector;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum ReportLine {
    ClipStarted { label: String },
    ClipMean { label: String, mean: u32 },
    ClipFailed { label: String, reason: String },
}

/// Owns the actor thread. Dropping the reporter (or calling [`stop`])
/// closes the channel and joins the thread, flushing queued lines first.
///
/// [`stop`]: Reporter::stop
pub struct Reporter {
    tx: Option<Sender<ReportLine>>,
    thread: Option<JoinHandle<()>>,
    policy: ContentionPolicy,
    send_timeout: Duration,
    metrics: MetricsCollector,
}

impl Reporter {
    pub fn start(
        policy: ContentionPolicy,
        send_timeout: Duration,
        metrics: MetricsCollector,
    ) -> Self {
        let (tx, rx) = bounded::<ReportLine>(CHANNEL_CAPACITY);
        let thread = std::thread::Builder::new()
            .name("luma-reporter".to_string())
            .spawn(move || {
                for line in rx.iter() {
                    emit(&line);
                }
            })
            .ok();
        Self {
            tx: Some(tx),
            thread,
            policy,
            send_timeout,
            metrics,
        }
    }

    /// A cheap clone workers carry into their threads.
    pub fn handle(&self) -> ReporterHandle {
        ReporterHandle {
            tx: self
                .tx
                .clone()
                .unwrap_or_else(|| bounded(0).0),
            policy: self.policy,
            send_timeout: self.send_timeout,
            metrics: self.metrics.clone(),
        }
    }

    pub fn stop(&mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Clone)]
pub struct ReporterHandle {
    tx: Sender<ReportLine>,
    policy: ContentionPolicy,
    send_timeout: Duration,
    metrics: MetricsCollector,
}

impl ReporterHandle {
    pub fn clip_started(&self, label: &str) -> Result<bool> {
        self.submit(ReportLine::ClipStarted {
            label: label.to_string(),
        })
    }

    pub fn clip_mean(&self, label: &str, mean: u32) -> Result<bool> {
        self.submit(ReportLine::ClipMean {
            label: label.to_string(),
            mean,
        })
    }

    pub fn clip_failed(&self, label: &str, reason: &str) -> Result<bool> {
        self.submit(ReportLine::ClipFailed {
            label: label.to_string(),
            reason: reason.to_string(),
        })
    }

    /// `Ok(false)` means the line was dropped under the `skip` policy; the
    /// drop is counted and logged. Disconnection only happens during
    /// shutdown and is treated as a drop.
    fn submit(&self, line: ReportLine) -> Result<bool> {
        match self.policy {
            ContentionPolicy::Block => match self.tx.send(line) {
                Ok(()) => Ok(true),
                Err(_) => {
                    self.metrics.record_report_dropped();
                    Ok(false)
                }
            },
            ContentionPolicy::Skip | ContentionPolicy::Fail => {
                match self.tx.send_timeout(line, self.send_timeout) {
                    Ok(()) => Ok(true),
                    Err(SendTimeoutError::Timeout(_))
                        if self.policy == ContentionPolicy::Fail =>
                    {
                        Err(Error::Contention {
                            operation: "report channel",
                            waited_ms: self.send_timeout.as_millis() as u64,
                        })
                    }
                    Err(_) => {
                        self.metrics.record_report_dropped();
                        warn!(
                            timeout_ms = self.send_timeout.as_millis() as u64,
                            "Report line dropped: channel still full when the wait expired"
                        );
                        Ok(false)
                    }
                }
            }
        }
    }
}

fn emit(line: &ReportLine) {
    match line {
        ReportLine::ClipStarted { label } => {
            info!(clip = label.as_str(), "Analyzing clip");
        }
        ReportLine::ClipMean { label, mean } => {
            info!(clip = label.as_str(), mean_luma = mean, "Clip mean luminosity");
        }
        ReportLine::ClipFailed { label, reason } => {
            warn!(
                clip = label.as_str(),
                reason = reason.as_str(),
                "Clip analysis failed"
            );
        }
    }
}
