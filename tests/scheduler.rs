use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lumascan::Error;
use lumascan::config::AnalyzerConfig;
use lumascan::observability::MetricsCollector;
use lumascan::scheduler::BatchScheduler;
use lumascan::video::{Decoder, Frame, PixelLayout};

fn fake_paths(count: usize) -> Vec<PathBuf> {
    (0..count).map(|i| PathBuf::from(format!("{i}.lvr"))).collect()
}

fn path_index(path: &Path) -> usize {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse().ok())
        .expect("probe paths are numbered")
}

/// Decoder that observes scheduling instead of touching the filesystem.
struct ProbeDecoder {
    in_flight: AtomicUsize,
    max_observed: AtomicUsize,
    spans: Mutex<Vec<(usize, Instant, Instant)>>,
    delay: Duration,
}

impl ProbeDecoder {
    fn new(delay: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_observed: AtomicUsize::new(0),
            spans: Mutex::new(Vec::new()),
            delay,
        }
    }
}

impl Decoder for ProbeDecoder {
    fn decode(&self, path: &Path) -> lumascan::Result<Vec<Frame>> {
        let started = Instant::now();
        let live = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed.fetch_max(live, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let index = path_index(path);
        self.spans
            .lock()
            .unwrap()
            .push((index, started, Instant::now()));
        let value = index as u8;
        Ok(vec![Frame::new(2, 2, PixelLayout::Bgr24, vec![value; 12])])
    }
}

struct FailingDecoder {
    bad: PathBuf,
}

impl Decoder for FailingDecoder {
    fn decode(&self, path: &Path) -> lumascan::Result<Vec<Frame>> {
        if path == self.bad {
            return Err(Error::Decode {
                path: path.to_path_buf(),
                reason: "synthetic failure".to_string(),
            });
        }
        Ok(vec![Frame::new(2, 2, PixelLayout::Bgr24, vec![80; 12])])
    }
}

struct PanickingDecoder {
    bad: PathBuf,
}

impl Decoder for PanickingDecoder {
    fn decode(&self, path: &Path) -> lumascan::Result<Vec<Frame>> {
        if path == self.bad {
            panic!("synthetic decoder panic");
        }
        Ok(vec![Frame::new(2, 2, PixelLayout::Bgr24, vec![80; 12])])
    }
}

fn scheduler_with(decoder: Arc<dyn Decoder>, cap: usize) -> (BatchScheduler, MetricsCollector) {
    let metrics = MetricsCollector::new();
    let scheduler =
        BatchScheduler::new(AnalyzerConfig::default(), cap, decoder, metrics.clone()).unwrap();
    (scheduler, metrics)
}

#[test]
fn worker_cap_is_validated_before_scheduling() {
    let decoder: Arc<dyn Decoder> = Arc::new(ProbeDecoder::new(Duration::ZERO));
    let metrics = MetricsCollector::new();

    for cap in [0usize, 101, 5_000] {
        let result = BatchScheduler::new(
            AnalyzerConfig::default(),
            cap,
            decoder.clone(),
            metrics.clone(),
        );
        assert!(matches!(result, Err(Error::Config(_))), "cap {cap}");
    }
    for cap in [1usize, 100] {
        assert!(
            BatchScheduler::new(
                AnalyzerConfig::default(),
                cap,
                decoder.clone(),
                metrics.clone(),
            )
            .is_ok(),
            "cap {cap}"
        );
    }
}

#[test]
fn batch_count_follows_the_ceiling_split() {
    let decoder = Arc::new(ProbeDecoder::new(Duration::ZERO));
    let (scheduler, _metrics) = scheduler_with(decoder, 2);

    let outcome = scheduler.run(&fake_paths(5));
    assert_eq!(outcome.batches, 3);
    assert_eq!(outcome.scores.len(), 5);
    assert!(outcome.failures.is_empty());

    let mut indices: Vec<usize> = outcome.scores.iter().map(|s| s.input_index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[test]
fn one_input_needs_one_batch_regardless_of_cap() {
    let decoder = Arc::new(ProbeDecoder::new(Duration::ZERO));
    let (scheduler, _metrics) = scheduler_with(decoder, 8);
    let outcome = scheduler.run(&fake_paths(1));
    assert_eq!(outcome.batches, 1);
    assert_eq!(outcome.scores.len(), 1);
}

#[test]
fn concurrency_never_exceeds_the_cap() {
    let probe = Arc::new(ProbeDecoder::new(Duration::from_millis(30)));
    let (scheduler, _metrics) = scheduler_with(probe.clone(), 3);

    let outcome = scheduler.run(&fake_paths(7));
    assert_eq!(outcome.batches, 3);
    assert_eq!(outcome.scores.len(), 7);
    assert!(probe.max_observed.load(Ordering::SeqCst) <= 3);
}

#[test]
fn a_batch_fully_joins_before_the_next_starts() {
    let probe = Arc::new(ProbeDecoder::new(Duration::from_millis(20)));
    let cap = 2usize;
    let (scheduler, _metrics) = scheduler_with(probe.clone(), cap);

    scheduler.run(&fake_paths(6));

    let spans = probe.spans.lock().unwrap();
    assert_eq!(spans.len(), 6);
    for &(index, start, _end) in spans.iter() {
        let batch = index / cap;
        for &(other_index, _other_start, other_end) in spans.iter() {
            if other_index / cap < batch {
                assert!(
                    other_end <= start,
                    "input {index} started before input {other_index} finished"
                );
            }
        }
    }
}

#[test]
fn a_failing_decode_leaves_sibling_clips_intact() {
    let decoder = Arc::new(FailingDecoder {
        bad: PathBuf::from("1.lvr"),
    });
    let (scheduler, metrics) = scheduler_with(decoder, 3);

    let outcome = scheduler.run(&fake_paths(3));
    assert_eq!(outcome.scores.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].input_index, 1);
    assert!(outcome.failures[0].reason.contains("synthetic failure"));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.clips_analyzed, 2);
    assert_eq!(snapshot.clips_failed, 1);
}

#[test]
fn a_panicking_worker_is_contained() {
    let decoder = Arc::new(PanickingDecoder {
        bad: PathBuf::from("0.lvr"),
    });
    let (scheduler, metrics) = scheduler_with(decoder, 2);

    let outcome = scheduler.run(&fake_paths(3));
    assert_eq!(outcome.scores.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].reason, "worker panicked");
    assert_eq!(metrics.snapshot().clips_failed, 1);
}
