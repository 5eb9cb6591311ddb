//! Camera providers: where a scan gets its stream of frames

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use flume::{bounded, Receiver, TrySendError};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::capture::frame::{Frame, FrameMetadata, PixelFormat, Rotation};
use crate::capture::source::{FramePool, FrameSource};
use crate::error::ScanError;
use crate::CaptureConfig;

/// Requested screen orientation lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Camera-facing part of a scan request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraRequest {
    pub prefer_front_camera: bool,
    pub torch_on: bool,
    pub orientation: Option<Orientation>,
}

/// An open camera: frames arrive on `frames` and go back through `source`
pub struct CameraStream {
    pub frames: Receiver<Frame>,
    pub source: Arc<dyn FrameSource>,
    task: Option<JoinHandle<()>>,
}

impl CameraStream {
    pub fn new(frames: Receiver<Frame>, source: Arc<dyn FrameSource>) -> Self {
        Self {
            frames,
            source,
            task: None,
        }
    }

    fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Opens a frame stream for a scan. Must be called from within a Tokio runtime.
pub trait CameraProvider: Send + Sync {
    fn open(&self, request: &CameraRequest) -> Result<CameraStream, ScanError>;
}

/// Camera that renders NV21 test frames from a fixed buffer pool
///
/// After `payload_after_frames` frames, the given payload bytes are stamped
/// at the start of the luma plane of every frame.
pub struct SyntheticCamera {
    config: CaptureConfig,
    payload: Option<Vec<u8>>,
    frame_limit: Option<u64>,
}

impl SyntheticCamera {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            payload: None,
            frame_limit: None,
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Close the stream after `limit` frames
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    fn render(&self, buf: &mut [u8], sequence: u64) {
        let luma_len = (self.config.width * self.config.height) as usize;
        let (luma, chroma) = buf.split_at_mut(luma_len.min(buf.len()));

        // Moving gradient so consecutive frames differ
        let width = self.config.width.max(1) as usize;
        for (i, px) in luma.iter_mut().enumerate() {
            *px = ((i % width) as u64 + sequence) as u8;
        }
        chroma.fill(128);

        if sequence >= self.config.payload_after_frames {
            if let Some(payload) = &self.payload {
                let n = payload.len().min(luma.len());
                luma[..n].copy_from_slice(&payload[..n]);
            }
        }
    }
}

impl CameraProvider for SyntheticCamera {
    fn open(&self, request: &CameraRequest) -> Result<CameraStream, ScanError> {
        if self.config.format != PixelFormat::Nv21 {
            return Err(ScanError::Camera(format!(
                "Synthetic camera only renders NV21, got {:?}",
                self.config.format
            )));
        }

        info!(
            "Opening synthetic camera {}x{}@{} ({:?})",
            self.config.width, self.config.height, self.config.fps, request
        );

        let frame_len = self
            .config
            .format
            .frame_len(self.config.width, self.config.height);
        let pool = Arc::new(FramePool::new(self.config.buffer_count as usize, frame_len));
        let (tx, rx) = bounded::<Frame>(self.config.buffer_count as usize);

        let camera = Self {
            config: self.config.clone(),
            payload: self.payload.clone(),
            frame_limit: self.frame_limit,
        };
        let rotation = if request.orientation == Some(Orientation::Landscape) {
            Rotation::Deg0
        } else {
            Rotation::Deg90
        };
        let producer_pool = Arc::clone(&pool);

        let task = tokio::spawn(async move {
            let period = Duration::from_secs(1) / camera.config.fps.max(1);
            let mut ticker = tokio::time::interval(period);
            let mut sequence = 0u64;

            loop {
                ticker.tick().await;
                if tx.is_disconnected() {
                    break;
                }
                if camera.frame_limit.is_some_and(|limit| sequence >= limit) {
                    debug!("Synthetic camera reached its frame limit");
                    break;
                }

                let Some(mut buf) = producer_pool.acquire() else {
                    trace!("Buffer pool exhausted, skipping frame");
                    continue;
                };
                sequence += 1;
                camera.render(&mut buf, sequence);

                let frame = Frame::new(
                    Bytes::from(buf),
                    FrameMetadata {
                        sequence,
                        width: camera.config.width,
                        height: camera.config.height,
                        rotation,
                        format: camera.config.format,
                    },
                );

                match tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(frame)) => producer_pool.release_frame(frame),
                    Err(TrySendError::Disconnected(frame)) => {
                        producer_pool.release_frame(frame);
                        break;
                    }
                }
            }
        });

        Ok(CameraStream::new(rx, pool).with_task(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> CaptureConfig {
        CaptureConfig {
            width: 8,
            height: 4,
            fps: 200,
            buffer_count: 2,
            format: PixelFormat::Nv21,
            payload_after_frames: 2,
        }
    }

    #[test]
    fn test_payload_stamped_after_threshold() {
        let camera = SyntheticCamera::new(small_config()).with_payload(b"HI".to_vec());
        let mut buf = vec![0u8; 48];

        camera.render(&mut buf, 1);
        assert_ne!(&buf[..2], b"HI");
        assert!(buf[32..].iter().all(|&b| b == 128));

        camera.render(&mut buf, 2);
        assert_eq!(&buf[..2], b"HI");
    }

    #[tokio::test]
    async fn test_stream_closes_at_frame_limit() {
        let camera = SyntheticCamera::new(small_config()).with_frame_limit(3);
        let stream = camera.open(&CameraRequest::default()).unwrap();

        let mut seen = Vec::new();
        while let Ok(frame) = stream.frames.recv_async().await {
            seen.push(frame.sequence());
            stream.source.release_frame(frame);
        }
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&sequence| (1..=3).contains(&sequence)));
    }

    #[test]
    fn test_rejects_non_nv21() {
        let mut config = small_config();
        config.format = PixelFormat::Rgb24;
        let camera = SyntheticCamera::new(config);
        assert!(matches!(
            camera.open(&CameraRequest::default()),
            Err(ScanError::Camera(_))
        ));
    }
}
