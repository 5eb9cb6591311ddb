//! Shared fixtures: a detector the test resolves by hand, and recording
//! sources and sinks.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use scanline::capture::{Frame, FrameMetadata, FrameSource, PixelFormat, Rotation};
use scanline::pipeline::{Detector, ResultSink};
use scanline::scanner::{Barcode, BarcodeFormat};
use scanline::DetectError;

pub const WAIT: Duration = Duration::from_secs(2);
pub const QUIET: Duration = Duration::from_millis(50);

pub fn frame(sequence: u64) -> Frame {
    Frame::new(
        Bytes::from(vec![sequence as u8; 16]),
        FrameMetadata {
            sequence,
            width: 4,
            height: 4,
            rotation: Rotation::Deg0,
            format: PixelFormat::Gray8,
        },
    )
}

pub fn qr(text: &str) -> Barcode {
    Barcode::new(text, BarcodeFormat::QrCode)
}

/// Wait for the next message, failing the test after `WAIT`
pub async fn next<T>(rx: &flume::Receiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv_async())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

/// Assert nothing shows up on `rx` for a short while
pub async fn assert_quiet<T: std::fmt::Debug>(rx: &flume::Receiver<T>) {
    tokio::time::sleep(QUIET).await;
    let pending: Vec<T> = rx.drain().collect();
    assert!(pending.is_empty(), "unexpected events: {pending:?}");
}

/// One outstanding `detect` call waiting for the test to answer it
pub struct Call {
    pub sequence: u64,
    reply: oneshot::Sender<Result<Vec<Barcode>, DetectError>>,
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call").field("sequence", &self.sequence).finish()
    }
}

impl Call {
    pub fn resolve(self, outcome: Result<Vec<Barcode>, DetectError>) {
        let _ = self.reply.send(outcome);
    }
}

/// Detector whose calls are answered by the test
pub struct GatedDetector {
    calls: flume::Sender<Call>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    closed: AtomicUsize,
}

impl GatedDetector {
    pub fn new() -> (Arc<Self>, flume::Receiver<Call>) {
        let (tx, rx) = flume::unbounded();
        let detector = Arc::new(Self {
            calls: tx,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        });
        (detector, rx)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Detector for GatedDetector {
    type Item = Barcode;

    async fn detect(&self, frame: &Frame) -> Result<Vec<Barcode>, DetectError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let (reply, answer) = oneshot::channel();
        let _ = self.calls.send(Call {
            sequence: frame.sequence(),
            reply,
        });
        let outcome = answer.await.unwrap_or(Err(DetectError::Closed));

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Frame source that records every release
pub struct RecordingSource {
    released: Mutex<Vec<u64>>,
    events: flume::Sender<u64>,
}

impl RecordingSource {
    pub fn new() -> (Arc<Self>, flume::Receiver<u64>) {
        let (tx, rx) = flume::unbounded();
        let source = Arc::new(Self {
            released: Mutex::new(Vec::new()),
            events: tx,
        });
        (source, rx)
    }

    pub fn released(&self) -> Vec<u64> {
        self.released.lock().clone()
    }
}

impl FrameSource for RecordingSource {
    fn release_frame(&self, frame: Frame) {
        self.released.lock().push(frame.sequence());
        let _ = self.events.send(frame.sequence());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Detected(Barcode),
    Error(DetectError),
}

/// Result sink that forwards everything to a channel
pub struct RecordingSink {
    events: flume::Sender<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> (Self, flume::Receiver<SinkEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { events: tx }, rx)
    }
}

impl ResultSink<Barcode> for RecordingSink {
    fn on_detected(&self, item: Barcode) {
        let _ = self.events.send(SinkEvent::Detected(item));
    }

    fn on_error(&self, error: DetectError) {
        let _ = self.events.send(SinkEvent::Error(error));
    }
}
