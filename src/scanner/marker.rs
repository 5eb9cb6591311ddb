//! Loopback barcode engine
//!
//! Reads a plain-text marker stamped at the top-left of the luma plane,
//! `SCANLINE:<FORMAT>:<text>` terminated by a NUL byte. Pairs with
//! `SyntheticCamera` to drive scans without a camera or a decoder.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::capture::Frame;
use crate::error::DetectError;
use crate::pipeline::Detector;
use crate::scanner::barcode::Barcode;
use crate::scanner::format::BarcodeFormat;

const MARKER_PREFIX: &[u8] = b"SCANLINE:";

/// Marker bytes for `text` encoded as `format`
pub fn encode_marker(format: BarcodeFormat, text: &str) -> Vec<u8> {
    let mut marker = MARKER_PREFIX.to_vec();
    marker.extend_from_slice(format.as_str().as_bytes());
    marker.push(b':');
    marker.extend_from_slice(text.as_bytes());
    marker.push(0);
    marker
}

#[derive(Debug, Default)]
pub struct MarkerDetector {
    closed: AtomicBool,
}

impl MarkerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn decode(luma: &[u8]) -> Result<Option<Barcode>, DetectError> {
        let Some(body) = luma.strip_prefix(MARKER_PREFIX) else {
            return Ok(None);
        };
        let end = body
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| DetectError::Failed("unterminated marker".into()))?;
        let body = std::str::from_utf8(&body[..end])
            .map_err(|e| DetectError::Failed(format!("marker is not UTF-8: {e}")))?;
        let (format, text) = body
            .split_once(':')
            .ok_or_else(|| DetectError::Failed("marker has no format".into()))?;
        let format = format.parse().map_err(DetectError::Failed)?;

        Ok(Some(Barcode::new(text, format)))
    }
}

#[async_trait]
impl Detector for MarkerDetector {
    type Item = Barcode;

    async fn detect(&self, frame: &Frame) -> Result<Vec<Barcode>, DetectError> {
        if self.is_closed() {
            return Err(DetectError::Closed);
        }
        if !frame.meta.format.has_luma_plane() {
            return Err(DetectError::InvalidFrame(format!(
                "{:?} frames carry no luma plane",
                frame.meta.format
            )));
        }

        let luma = &frame.data[..frame.luma_len()];
        Ok(Self::decode(luma)?.into_iter().collect())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
