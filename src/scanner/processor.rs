//! Barcode detector adapter: format filtering and inverted-frame retries

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, trace};

use crate::capture::Frame;
use crate::error::DetectError;
use crate::pipeline::Detector;
use crate::scanner::barcode::Barcode;
use crate::scanner::format::FormatSet;
use crate::scanner::invert::invert_frame;

/// Wraps a barcode engine for use in the frame pipeline.
///
/// Only barcodes in the enabled format set are reported. With
/// `invert_alternate_frames`, every second frame is given to the engine
/// with its colors inverted.
pub struct BarcodeProcessor<E> {
    engine: E,
    formats: FormatSet,
    invert_alternate_frames: bool,
    invert_next: AtomicBool,
}

impl<E> BarcodeProcessor<E>
where
    E: Detector<Item = Barcode>,
{
    pub fn new(engine: E, formats: FormatSet) -> Self {
        if formats.is_all() {
            info!("Barcode processor accepting all formats");
        } else {
            info!(
                "Barcode processor accepting {:?}",
                formats.iter().map(|f| f.as_str()).collect::<Vec<_>>()
            );
        }

        Self {
            engine,
            formats,
            invert_alternate_frames: false,
            invert_next: AtomicBool::new(false),
        }
    }

    pub fn with_inversion(mut self, enabled: bool) -> Self {
        self.invert_alternate_frames = enabled;
        self
    }

    pub fn formats(&self) -> FormatSet {
        self.formats
    }
}

#[async_trait]
impl<E> Detector for BarcodeProcessor<E>
where
    E: Detector<Item = Barcode>,
{
    type Item = Barcode;

    async fn detect(&self, frame: &Frame) -> Result<Vec<Barcode>, DetectError> {
        let invert =
            self.invert_alternate_frames && self.invert_next.fetch_xor(true, Ordering::Relaxed);

        let mut barcodes = if invert {
            trace!(sequence = frame.sequence(), "Detecting on inverted frame");
            self.engine.detect(&invert_frame(frame)).await?
        } else {
            self.engine.detect(frame).await?
        };
        barcodes.retain(|barcode| self.formats.accepts(barcode.format));

        match barcodes.first() {
            None => trace!("No barcode has been detected"),
            Some(barcode) => debug!(
                "Barcode detected: {}",
                barcode.display_value.as_deref().unwrap_or("NO Value")
            ),
        }
        Ok(barcodes)
    }

    fn close(&self) {
        self.engine.close()
    }
}
