//! One scan, from opening the camera to the first barcode

pub mod options;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info, instrument};

use crate::capture::CameraProvider;
use crate::error::ScanError;
use crate::pipeline::{sink_fn, Detector, FramePipeline};
use crate::scanner::{Barcode, BarcodeProcessor};

pub use options::ScanOptions;
pub use response::ScanResponse;

/// Hook run when a barcode is accepted, e.g. to play a beep
pub trait ScanFeedback: Send + Sync {
    fn success(&self, barcode: &Barcode);
}

impl ScanFeedback for () {
    fn success(&self, _barcode: &Barcode) {}
}

/// Ends a running scan with a cancelled response
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<Notify>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}

enum Ending {
    Found(Barcode),
    Cancelled,
}

pub struct ScanSession<E> {
    options: ScanOptions,
    engine: E,
    invert_alternate_frames: bool,
    feedback: Arc<dyn ScanFeedback>,
    cancel: CancelHandle,
}

impl<E> ScanSession<E>
where
    E: Detector<Item = Barcode>,
{
    pub fn new(options: ScanOptions, engine: E) -> Self {
        Self {
            options,
            engine,
            invert_alternate_frames: crate::CONFIG.load().pipeline.invert_alternate_frames,
            feedback: Arc::new(()),
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn ScanFeedback>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_inversion(mut self, enabled: bool) -> Self {
        self.invert_alternate_frames = enabled;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Scan until the first barcode, a cancel, or the end of the stream.
    #[instrument(skip_all)]
    pub async fn run(self, camera: &dyn CameraProvider) -> Result<ScanResponse, ScanError> {
        let Self {
            options,
            engine,
            invert_alternate_frames,
            feedback,
            cancel,
        } = self;

        if let Some(prompt) = &options.prompt {
            info!("Scan prompt: {}", prompt);
        }
        let stream = camera.open(&options.camera_request())?;

        let processor =
            BarcodeProcessor::new(engine, options.formats).with_inversion(invert_alternate_frames);
        let (found_tx, found_rx) = flume::bounded::<Barcode>(1);
        let sink = sink_fn(
            move |barcode: Barcode| {
                // Only the first match matters, later ones are dropped
                let _ = found_tx.try_send(barcode);
            },
            |e| debug!("Frame not decoded: {}", e),
        );
        let pipeline = FramePipeline::new(processor, sink, Arc::clone(&stream.source))
            .stop_after_detection();

        let feeder = {
            let pipeline = pipeline.clone();
            let frames = stream.frames.clone();
            async move {
                while let Ok(frame) = frames.recv_async().await {
                    pipeline.submit_frame(frame);
                }
            }
        };

        let ending = tokio::select! {
            found = found_rx.recv_async() => found.map(Ending::Found).map_err(|_| ScanError::SourceClosed),
            _ = cancel.0.notified() => Ok(Ending::Cancelled),
            _ = feeder => {
                debug!("Frame stream closed, waiting for in-flight detection");
                tokio::select! {
                    _ = pipeline.wait_idle() => found_rx
                        .try_recv()
                        .map(Ending::Found)
                        .map_err(|_| ScanError::SourceClosed),
                    _ = cancel.0.notified() => Ok(Ending::Cancelled),
                }
            }
        };
        pipeline.stop();

        for frame in stream.frames.drain() {
            stream.source.release_frame(frame);
        }
        drop(stream);
        debug!(stats = ?pipeline.stats(), "Scan finished");

        match ending? {
            Ending::Cancelled => {
                info!("Scan cancelled");
                Ok(ScanResponse::cancelled())
            }
            Ending::Found(barcode) => {
                info!("Found {}: {}", barcode.format, barcode.text());
                if !options.disable_success_beep {
                    feedback.success(&barcode);
                }
                if options.result_display_duration_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(options.result_display_duration_ms))
                        .await;
                }
                Ok(ScanResponse::found(&barcode, options.assume_gs1))
            }
        }
    }
}
