use std::sync::Arc;

use tracing::{debug, instrument};

use crate::capture::{Frame, FrameLease, FrameSource};
use crate::error::DetectError;
use crate::pipeline::detector::Detector;

/// Run a detector over one still frame.
///
/// Returns the first detected item, or `None` when nothing was found or the
/// frame was empty. The frame is released to `source` before returning.
#[instrument(skip_all, fields(sequence = frame.sequence()))]
pub async fn detect_once<D: Detector + ?Sized>(
    detector: &D,
    frame: Frame,
    source: Arc<dyn FrameSource>,
) -> Result<Option<D::Item>, DetectError> {
    let lease = FrameLease::new(frame, source);
    let Some(frame) = lease.frame() else {
        return Ok(None);
    };
    if frame.is_empty() {
        debug!("Ignoring empty still frame");
        return Ok(None);
    }

    let items = detector.detect(frame).await?;
    debug!(found = items.len(), "Still frame detected");
    Ok(items.into_iter().next())
}
