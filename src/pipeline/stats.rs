use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, histogram};

/// Snapshot of pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_submitted: u64,
    /// Empty frames released without a look
    pub frames_ignored: u64,
    /// Pending frames superseded by a newer one before dispatch
    pub frames_dropped: u64,
    pub frames_dispatched: u64,
    pub detections: u64,
    pub empty_results: u64,
    pub detector_errors: u64,
    /// Results that arrived after stop
    pub results_discarded: u64,
    /// Capture-to-result time of the latest detection, in microseconds
    pub last_latency_us: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    frames_submitted: AtomicU64,
    frames_ignored: AtomicU64,
    frames_dropped: AtomicU64,
    frames_dispatched: AtomicU64,
    detections: AtomicU64,
    empty_results: AtomicU64,
    detector_errors: AtomicU64,
    results_discarded: AtomicU64,
    last_latency_us: AtomicU64,
}

impl Counters {
    pub fn submitted(&self) {
        self.frames_submitted.fetch_add(1, Ordering::Relaxed);
        counter!("scanline_frames_submitted").increment(1);
    }

    pub fn ignored(&self) {
        self.frames_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        counter!("scanline_frames_dropped").increment(1);
    }

    pub fn dispatched(&self) {
        self.frames_dispatched.fetch_add(1, Ordering::Relaxed);
        counter!("scanline_frames_dispatched").increment(1);
    }

    pub fn detection(&self) {
        self.detections.fetch_add(1, Ordering::Relaxed);
        counter!("scanline_detections").increment(1);
    }

    pub fn empty_result(&self) {
        self.empty_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detector_error(&self) {
        self.detector_errors.fetch_add(1, Ordering::Relaxed);
        counter!("scanline_detector_errors").increment(1);
    }

    pub fn discarded(&self) {
        self.results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latency(&self, elapsed: Duration) {
        self.last_latency_us
            .store(elapsed.as_micros() as u64, Ordering::Relaxed);
        histogram!("scanline_detection_latency_ms").record(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_submitted: self.frames_submitted.load(Ordering::Relaxed),
            frames_ignored: self.frames_ignored.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_dispatched: self.frames_dispatched.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
            empty_results: self.empty_results.load(Ordering::Relaxed),
            detector_errors: self.detector_errors.load(Ordering::Relaxed),
            results_discarded: self.results_discarded.load(Ordering::Relaxed),
            last_latency_us: self.last_latency_us.load(Ordering::Relaxed),
        }
    }
}
