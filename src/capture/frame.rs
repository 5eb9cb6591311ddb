use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Frame data with zero-copy semantics
#[derive(Clone)]
pub struct Frame {
    /// Immutable frame data - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(data: Bytes, meta: FrameMetadata) -> Self {
        Self {
            data,
            meta: Arc::new(meta),
            timestamp: Instant::now(),
        }
    }

    /// A frame with no pixels to look at. Never dispatched to a detector.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.meta.width == 0 || self.meta.height == 0
    }

    pub fn sequence(&self) -> u64 {
        self.meta.sequence
    }

    /// Size of the luma plane for planar YUV formats.
    pub fn luma_len(&self) -> usize {
        (self.meta.width as usize * self.meta.height as usize).min(self.data.len())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.data.len())
            .field("meta", &self.meta)
            .finish()
    }
}

/// Frame metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
    pub format: PixelFormat,
}

/// Clockwise rotation needed to bring the frame upright
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Y plane followed by interleaved VU, 12 bits per pixel
    Nv21,
    /// Y plane followed by separate U and V planes
    Yuv420,
    Gray8,
    Rgb24,
}

impl PixelFormat {
    /// Buffer size for a frame of the given dimensions.
    pub fn frame_len(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::Nv21 | Self::Yuv420 => pixels + pixels / 2,
            Self::Gray8 => pixels,
            Self::Rgb24 => pixels * 3,
        }
    }

    /// Whether the buffer starts with a full-resolution luma plane.
    pub fn has_luma_plane(self) -> bool {
        !matches!(self, Self::Rgb24)
    }
}
