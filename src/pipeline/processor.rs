//! Latest-wins frame pipeline in front of an asynchronous detector
//!
//! Frames are pushed at camera rate. At most one frame is with the detector
//! at any time; while it is busy, only the newest frame is kept and older
//! ones are released back to their source untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;
use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use crate::capture::{Frame, FrameLease, FrameSource};
use crate::error::DetectError;
use crate::pipeline::detector::{Detector, ResultSink};
use crate::pipeline::slots::FrameSlots;
use crate::pipeline::stats::{Counters, PipelineStats};

/// Frame pipeline handle. Cheap to clone; all clones drive the same state.
pub struct FramePipeline<D, S> {
    inner: Arc<Inner<D, S>>,
}

impl<D, S> Clone for FramePipeline<D, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<D, S> {
    detector: D,
    sink: S,
    source: Arc<dyn FrameSource>,
    slots: Mutex<FrameSlots>,
    /// Held while a result is handed to the sink, and by `stop`. Reentrant so
    /// the sink may stop the pipeline itself.
    forwarding: ReentrantMutex<()>,
    stop_on_detection: AtomicBool,
    idle: Notify,
    counters: CachePadded<Counters>,
    runtime: Handle,
}

impl<D, S> FramePipeline<D, S>
where
    D: Detector,
    S: ResultSink<D::Item>,
{
    /// Create a pipeline dispatching on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use [`Self::with_runtime`]
    /// from plain threads.
    pub fn new(detector: D, sink: S, source: Arc<dyn FrameSource>) -> Self {
        Self::with_runtime(detector, sink, source, Handle::current())
    }

    pub fn with_runtime(
        detector: D,
        sink: S,
        source: Arc<dyn FrameSource>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                detector,
                sink,
                source,
                slots: Mutex::new(FrameSlots::new()),
                forwarding: ReentrantMutex::new(()),
                stop_on_detection: AtomicBool::new(false),
                idle: Notify::new(),
                counters: CachePadded::new(Counters::default()),
                runtime,
            }),
        }
    }

    /// Stop the pipeline as part of delivering the first detection, before
    /// any pending frame can be dispatched.
    pub fn stop_after_detection(self) -> Self {
        self.inner.stop_on_detection.store(true, Ordering::Relaxed);
        self
    }

    /// Hand a frame to the pipeline. Never waits on detection.
    ///
    /// The frame is released to the source exactly once: when it is
    /// superseded, rejected, or done being detected.
    pub fn submit_frame(&self, frame: Frame) {
        self.inner.submit(frame)
    }

    /// Stop dispatching. An in-flight detection is left to finish but its
    /// result is discarded. A result already being handed to the sink is
    /// let through first, so no sink call happens after this returns.
    /// Idempotent.
    pub fn stop(&self) {
        self.inner.stop()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.slots.lock().is_shutdown()
    }

    /// Whether no frame is pending or in flight
    pub fn is_idle(&self) -> bool {
        let slots = self.inner.slots.lock();
        slots.in_flight().is_none() && slots.pending().is_none()
    }

    /// Resolves once no frame is pending or in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.inner.counters.snapshot()
    }
}

impl<D, S> Inner<D, S>
where
    D: Detector,
    S: ResultSink<D::Item>,
{
    fn submit(self: &Arc<Self>, frame: Frame) {
        self.counters.submitted();

        if frame.is_empty() {
            debug!(sequence = frame.sequence(), "Ignoring empty frame");
            self.counters.ignored();
            self.source.release_frame(frame);
            return;
        }

        let lease = FrameLease::new(frame, Arc::clone(&self.source));
        let (offered, next) = {
            let mut slots = self.slots.lock();
            let offered = slots.offer(lease);
            let next = if offered.is_ok() { slots.promote() } else { None };
            (offered, next)
        };

        match offered {
            Err(rejected) => {
                trace!(sequence = ?rejected.sequence(), "Pipeline stopped, releasing frame");
            }
            Ok(Some(superseded)) => {
                trace!(sequence = ?superseded.sequence(), "Dropping superseded frame");
                self.counters.dropped();
            }
            Ok(None) => {}
        }

        if let Some(frame) = next {
            self.dispatch(frame);
        }
    }

    fn dispatch(self: &Arc<Self>, frame: Frame) {
        trace!(sequence = frame.sequence(), "Dispatching frame to detector");
        self.counters.dispatched();

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let sequence = frame.sequence();
            let captured = frame.timestamp;
            let detection = {
                let inner = Arc::clone(&inner);
                tokio::spawn(async move { inner.detector.detect(&frame).await })
            };

            // A panicking detector must not wedge the in-flight slot
            let outcome = match detection.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(sequence, "Detector task failed: {}", e);
                    Err(DetectError::Failed(format!("detector task failed: {e}")))
                }
            };
            inner.counters.latency(captured.elapsed());
            inner.complete(outcome);
        });
    }

    fn complete(self: &Arc<Self>, outcome: Result<Vec<D::Item>, DetectError>) {
        let forwarding = self.forwarding.lock();
        let mut halted = None;
        let discard = {
            let mut slots = self.slots.lock();
            let discard = slots.is_shutdown();
            if !discard
                && self.stop_on_detection.load(Ordering::Relaxed)
                && matches!(&outcome, Ok(items) if !items.is_empty())
            {
                halted = Some(slots.shut_down());
            }
            discard
        };

        if discard {
            debug!("Pipeline stopped, discarding detector result");
            self.counters.discarded();
        } else {
            self.forward(outcome);
        }
        drop(forwarding);

        if let Some((first, pending)) = halted {
            drop(pending);
            if first {
                self.close_detector();
            }
        }

        let (finished, next) = {
            let mut slots = self.slots.lock();
            let finished = slots.complete();
            (finished, slots.promote())
        };
        drop(finished);

        match next {
            Some(frame) => self.dispatch(frame),
            None => self.idle.notify_waiters(),
        }
    }

    fn forward(&self, outcome: Result<Vec<D::Item>, DetectError>) {
        match outcome {
            Ok(items) => match items.into_iter().next() {
                Some(first) => {
                    self.counters.detection();
                    self.sink.on_detected(first);
                }
                None => {
                    trace!("Nothing detected");
                    self.counters.empty_result();
                }
            },
            Err(e) => {
                warn!("Detection failed: {}", e);
                self.counters.detector_error();
                self.sink.on_error(e);
            }
        }
    }

    fn stop(&self) {
        let (first, pending) = {
            let _forwarding = self.forwarding.lock();
            self.slots.lock().shut_down()
        };
        drop(pending);
        self.idle.notify_waiters();

        if first {
            self.close_detector();
        }
    }

    fn close_detector(&self) {
        info!("Frame pipeline stopped");
        self.detector.close();
    }
}
