//! Frame ownership: sources, leases and the fixed-size buffer pool

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use crossbeam::utils::CachePadded;
use tracing::{trace, warn};

use crate::capture::Frame;

/// Producer of frames that wants every frame handed back when the consumer
/// is done with it, so the backing memory can be reused.
pub trait FrameSource: Send + Sync {
    fn release_frame(&self, frame: Frame);
}

/// Source for frames whose buffers are not pooled, such as decoded still
/// images. Released frames are simply dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unpooled;

impl FrameSource for Unpooled {
    fn release_frame(&self, _frame: Frame) {}
}

/// A frame that still has to be returned to its source.
///
/// Dropping the lease releases the frame, so each leased frame goes back to
/// its source exactly once no matter which path discards it.
pub struct FrameLease {
    frame: Option<Frame>,
    source: Arc<dyn FrameSource>,
}

impl FrameLease {
    pub fn new(frame: Frame, source: Arc<dyn FrameSource>) -> Self {
        Self {
            frame: Some(frame),
            source,
        }
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn sequence(&self) -> Option<u64> {
        self.frame.as_ref().map(Frame::sequence)
    }
}

impl std::fmt::Debug for FrameLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLease")
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            trace!(sequence = frame.sequence(), "Releasing frame");
            self.source.release_frame(frame);
        }
    }
}

/// Fixed-size pool of frame buffers
pub struct FramePool {
    free: ArrayQueue<Vec<u8>>,
    frame_len: usize,
    stats: CachePadded<PoolStats>,
}

#[derive(Default)]
struct PoolStats {
    acquired: AtomicU64,
    released: AtomicU64,
    exhausted: AtomicU64,
}

impl FramePool {
    /// Pre-allocate `capacity` buffers of `frame_len` bytes each
    pub fn new(capacity: usize, frame_len: usize) -> Self {
        let free = ArrayQueue::new(capacity.max(1));
        for _ in 0..capacity.max(1) {
            // Cannot overflow, the queue was sized for exactly these buffers
            let _ = free.push(vec![0u8; frame_len]);
        }

        Self {
            free,
            frame_len,
            stats: CachePadded::new(PoolStats::default()),
        }
    }

    /// Take a free buffer, or `None` while every buffer is leased out
    pub fn acquire(&self) -> Option<Vec<u8>> {
        match self.free.pop() {
            Some(buf) => {
                self.stats.acquired.fetch_add(1, Ordering::Relaxed);
                Some(buf)
            }
            None => {
                self.stats.exhausted.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.free.capacity()
    }

    /// Buffers currently leased out
    pub fn outstanding(&self) -> usize {
        self.free.capacity() - self.free.len()
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// (acquired, released, exhausted)
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.stats.acquired.load(Ordering::Relaxed),
            self.stats.released.load(Ordering::Relaxed),
            self.stats.exhausted.load(Ordering::Relaxed),
        )
    }
}

impl FrameSource for FramePool {
    fn release_frame(&self, frame: Frame) {
        // Reuses the allocation when this was the last handle on the buffer
        let mut buf = Vec::<u8>::from(frame.data);
        buf.resize(self.frame_len, 0);

        if self.free.push(buf).is_err() {
            warn!(
                sequence = frame.meta.sequence,
                "Frame released to a full pool, dropping buffer"
            );
            return;
        }
        self.stats.released.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameMetadata, PixelFormat, Rotation};
    use bytes::Bytes;

    fn frame_from(buf: Vec<u8>, sequence: u64) -> Frame {
        Frame::new(
            Bytes::from(buf),
            FrameMetadata {
                sequence,
                width: 4,
                height: 2,
                rotation: Rotation::Deg0,
                format: PixelFormat::Gray8,
            },
        )
    }

    #[test]
    fn test_pool_exhaustion_and_return() {
        let pool = Arc::new(FramePool::new(2, 8));
        let a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        assert_eq!(pool.outstanding(), 2);

        pool.release_frame(frame_from(a, 1));
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.acquire().map(|b| b.len()), Some(8));
        assert_eq!(pool.stats(), (3, 1, 1));
    }

    #[test]
    fn test_lease_releases_once_on_drop() {
        let pool = Arc::new(FramePool::new(1, 8));
        let buf = pool.acquire().unwrap();
        let lease = FrameLease::new(frame_from(buf, 7), pool.clone());
        assert_eq!(lease.sequence(), Some(7));
        assert_eq!(pool.outstanding(), 1);

        drop(lease);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.stats().1, 1);
    }
}
