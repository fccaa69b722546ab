use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub clips: BTreeMap<String, ClipMetrics>,
    pub clips_analyzed: u64,
    pub clips_failed: u64,
    pub frames_appended: u64,
    pub planes_computed: u64,
    pub appends_skipped: u64,
    pub reports_dropped: u64,
    pub mean_computations: u64,
    pub frames_exported: u64,
    pub total_duration_ms: f64,
}

#[derive(Debug, Default, Serialize, Clone)]
pub struct ClipMetrics {
    pub duration_ms: f64,
}

#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsSnapshot>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsSnapshot::default())),
        }
    }

    pub fn start_clip(&self, label: &str) -> ClipTimer {
        ClipTimer {
            label: label.to_string(),
            started_at: Instant::now(),
            collector: self.inner.clone(),
            recorded: false,
        }
    }

    pub fn record_clip_analyzed(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.clips_analyzed += 1;
        }
    }

    pub fn record_clip_failed(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.clips_failed += 1;
        }
    }

    pub fn record_frame_appended(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.frames_appended += 1;
        }
    }

    pub fn record_planes_computed(&self, count: u64) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.planes_computed += count;
        }
    }

    pub fn record_append_skipped(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.appends_skipped += 1;
        }
    }

    pub fn record_report_dropped(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.reports_dropped += 1;
        }
    }

    pub fn record_mean_computation(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.mean_computations += 1;
        }
    }

    pub fn record_frames_exported(&self, count: u64) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.frames_exported += count;
        }
    }

    pub fn record_total_duration(&self, duration: Duration) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.total_duration_ms = duration.as_secs_f64() * 1_000.0;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

pub struct ClipTimer {
    label: String,
    started_at: Instant,
    collector: Arc<Mutex<MetricsSnapshot>>,
    recorded: bool,
}

impl ClipTimer {
    fn record(&mut self) {
        if self.recorded {
            return;
        }
        let duration = self.started_at.elapsed();
        if let Ok(mut guard) = self.collector.lock() {
            let metrics = guard.clips.entry(self.label.clone()).or_default();
            metrics.duration_ms = duration.as_secs_f64() * 1_000.0;
        }
        debug!(
            clip = self.label.as_str(),
            duration_ms = duration.as_secs_f64() * 1_000.0,
            "Clip duration recorded"
        );
        self.recorded = true;
    }
}

impl Drop for ClipTimer {
    fn drop(&mut self) {
        self.record();
    }
}

pub fn log_snapshot(snapshot: &MetricsSnapshot) {
    info!(
        clips_analyzed = snapshot.clips_analyzed,
        clips_failed = snapshot.clips_failed,
        frames_appended = snapshot.frames_appended,
        planes_computed = snapshot.planes_computed,
        appends_skipped = snapshot.appends_skipped,
        reports_dropped = snapshot.reports_dropped,
        mean_computations = snapshot.mean_computations,
        frames_exported = snapshot.frames_exported,
        total_duration_ms = snapshot.total_duration_ms,
        "Run metrics summary"
    );
    for (clip, metrics) in &snapshot.clips {
        info!(
            clip = clip.as_str(),
            duration_ms = metrics.duration_ms,
            "Clip metrics"
        );
    }
}
