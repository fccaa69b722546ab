use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::warn;

use crate::config::ContentionPolicy;
use crate::error::{Error, Result};
use crate::luma::{self, LumaMode, LumaPlane};
use crate::observability::MetricsCollector;
use crate::video::Frame;

/// One video under analysis: its frames, their luminosity planes and the
/// memoized per-frame and per-video averages.
///
/// All public operations are thread-safe. Internally a single non-recursive
/// mutex guards the mutable state; public entry points acquire it exactly
/// once and delegate to `_locked` helpers, so no code path ever re-acquires
/// the lock it already holds.
#[derive(Debug)]
pub struct Clip {
    path: PathBuf,
    label: String,
    policy: ContentionPolicy,
    append_timeout: Duration,
    state: Mutex<ClipState>,
    video_mean: OnceCell<u32>,
    metrics: MetricsCollector,
}

#[derive(Debug, Default)]
struct ClipState {
    frames: Vec<Frame>,
    planes: Vec<LumaPlane>,
    frame_means: Vec<u32>,
}

impl Clip {
    pub fn new(
        path: PathBuf,
        policy: ContentionPolicy,
        append_timeout: Duration,
        metrics: MetricsCollector,
    ) -> Self {
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "clip".to_string());
        Self {
            path,
            label,
            policy,
            append_timeout,
            state: Mutex::new(ClipState::default()),
            video_mean: OnceCell::new(),
            metrics,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stores one decoded frame.
    ///
    /// The state lock is acquired with a timeout; what happens when the wait
    /// expires depends on the configured [`ContentionPolicy`]. `Ok(false)`
    /// means the frame was dropped under the `skip` policy, which is counted
    /// and logged, never silent.
    pub fn append_frame(&self, frame: Frame) -> Result<bool> {
        let mut guard = match self.policy {
            ContentionPolicy::Block => self.state.lock(),
            ContentionPolicy::Skip | ContentionPolicy::Fail => {
                match self.state.try_lock_for(self.append_timeout) {
                    Some(guard) => guard,
                    None if self.policy == ContentionPolicy::Fail => {
                        return Err(Error::Contention {
                            operation: "clip state lock",
                            waited_ms: self.append_timeout.as_millis() as u64,
                        });
                    }
                    None => {
                        self.metrics.record_append_skipped();
                        warn!(
                            clip = self.label.as_str(),
                            timeout_ms = self.append_timeout.as_millis() as u64,
                            "Frame dropped: state lock still held when the wait expired"
                        );
                        return Ok(false);
                    }
                }
            }
        };
        append_frame_locked(&mut guard, frame);
        self.metrics.record_frame_appended();
        Ok(true)
    }

    /// Scores every stored frame with `mode`, replacing any planes from an
    /// earlier invocation and discarding stale per-frame means. Returns the
    /// number of planes produced; degenerate frames contribute none.
    pub fn compute_luminosity(&self, mode: LumaMode) -> usize {
        let mut guard = self.state.lock();
        let count = compute_luminosity_locked(&mut guard, mode);
        self.metrics.record_planes_computed(count as u64);
        count
    }

    /// Mean luminosity of the plane at `index` (position in the plane
    /// sequence, not the frame sequence). Zero for an empty plane.
    pub fn frame_mean(&self, index: usize) -> Result<u32> {
        let guard = self.state.lock();
        guard
            .planes
            .get(index)
            .map(LumaPlane::mean)
            .ok_or(Error::IndexOutOfRange {
                index,
                len: guard.planes.len(),
            })
    }

    /// Mean luminosity across all planes, memoized.
    ///
    /// The first call fills the per-frame mean cache and computes the video
    /// mean exactly once; every later call returns the stored value without
    /// touching the planes, even after [`compute_luminosity`] runs again.
    /// Zero when no planes exist.
    ///
    /// [`compute_luminosity`]: Clip::compute_luminosity
    pub fn mean_luminosity(&self) -> u32 {
        *self.video_mean.get_or_init(|| {
            self.metrics.record_mean_computation();
            let mut guard = self.state.lock();
            video_mean_locked(&mut guard)
        })
    }

    pub fn frame_count(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn plane_count(&self) -> usize {
        self.state.lock().planes.len()
    }

    /// Per-frame means captured by the first [`mean_luminosity`] call.
    ///
    /// [`mean_luminosity`]: Clip::mean_luminosity
    pub fn frame_means(&self) -> Vec<u32> {
        self.state.lock().frame_means.clone()
    }

    /// Source frame index of each plane, in plane order.
    pub fn plane_frame_indices(&self) -> Vec<usize> {
        self.state
            .lock()
            .planes
            .iter()
            .map(|plane| plane.frame_index)
            .collect()
    }
}

fn append_frame_locked(state: &mut ClipState, frame: Frame) {
    state.frames.push(frame);
}

fn compute_luminosity_locked(state: &mut ClipState, mode: LumaMode) -> usize {
    state.planes.clear();
    state.frame_means.clear();
    for (index, frame) in state.frames.iter().enumerate() {
        if let Some(plane) = luma::plane_for_frame(frame, index, mode) {
            state.planes.push(plane);
        }
    }
    state.planes.len()
}

fn video_mean_locked(state: &mut ClipState) -> u32 {
    state.frame_means = state.planes.iter().map(LumaPlane::mean).collect();
    if state.frame_means.is_empty() {
        return 0;
    }
    let sum: u64 = state.frame_means.iter().map(|&mean| u64::from(mean)).sum();
    (sum / state.frame_means.len() as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use crate::video::PixelLayout;

    fn grey_frame(value: u8) -> Frame {
        Frame::new(2, 2, PixelLayout::Bgr24, vec![value; 12])
    }

    fn test_clip(policy: ContentionPolicy) -> Clip {
        Clip::new(
            PathBuf::from("busy.lvr"),
            policy,
            Duration::from_millis(1),
            MetricsCollector::new(),
        )
    }

    #[test]
    fn skip_policy_drops_frame_when_lock_is_held() {
        let metrics = MetricsCollector::new();
        let clip = Clip::new(
            PathBuf::from("busy.lvr"),
            ContentionPolicy::Skip,
            Duration::from_millis(1),
            metrics.clone(),
        );

        // The state lock is non-recursive, so holding it here makes the
        // timed acquisition in append_frame expire.
        let guard = clip.state.lock();
        let appended = clip.append_frame(grey_frame(9)).unwrap();
        drop(guard);

        assert!(!appended);
        assert_eq!(clip.frame_count(), 0);
        assert_eq!(metrics.snapshot().appends_skipped, 1);
    }

    #[test]
    fn fail_policy_surfaces_contention() {
        let clip = test_clip(ContentionPolicy::Fail);
        let guard = clip.state.lock();
        let err = clip.append_frame(grey_frame(9)).unwrap_err();
        drop(guard);
        assert!(matches!(err, Error::Contention { .. }));
        assert_eq!(clip.frame_count(), 0);
    }

    #[test]
    fn block_policy_waits_out_contention() {
        let clip = Arc::new(test_clip(ContentionPolicy::Block));
        let contender = Arc::clone(&clip);

        let guard = clip.state.lock();
        let worker = thread::spawn(move || contender.append_frame(grey_frame(9)).unwrap());
        thread::sleep(Duration::from_millis(50));
        drop(guard);

        assert!(worker.join().unwrap());
        assert_eq!(clip.frame_count(), 1);
    }

    #[test]
    fn uncontended_append_succeeds_under_every_policy() {
        for policy in [
            ContentionPolicy::Skip,
            ContentionPolicy::Block,
            ContentionPolicy::Fail,
        ] {
            let clip = test_clip(policy);
            assert!(clip.append_frame(grey_frame(42)).unwrap());
            assert_eq!(clip.frame_count(), 1);
        }
    }
}
