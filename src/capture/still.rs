use std::path::Path;

use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};
use image::GrayImage;
use tracing::info;

use super::frame::{Frame, FrameMetadata, PixelFormat, Rotation};

/// Load a still image (JPEG or PNG) as a single grayscale frame
pub fn load_still(path: impl AsRef<Path>) -> Result<Frame> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| eyre!("Failed to open {}: {}", path.display(), e))?;
    let luma = img.to_luma8();
    info!(
        "Loaded still image {} ({}x{})",
        path.display(),
        luma.width(),
        luma.height()
    );
    Ok(frame_from_luma(luma, Rotation::Deg0))
}

/// Wrap an 8-bit luma image without copying its pixels
pub fn frame_from_luma(luma: GrayImage, rotation: Rotation) -> Frame {
    let (width, height) = luma.dimensions();
    Frame::new(
        Bytes::from(luma.into_raw()),
        FrameMetadata {
            sequence: 0,
            width,
            height,
            rotation,
            format: PixelFormat::Gray8,
        },
    )
}
