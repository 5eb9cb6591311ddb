//! Pending / in-flight slot state for the frame pipeline
//!
//! Holds at most one frame waiting for the detector and at most one frame
//! being detected. A newer frame replaces the waiting one rather than
//! queueing behind it.

use crate::capture::{Frame, FrameLease};

/// Slot state. Always accessed under the pipeline lock.
///
/// Methods hand superseded leases back to the caller instead of dropping them
/// so the release callback runs after the lock is let go.
#[derive(Default)]
pub struct FrameSlots {
    pending: Option<FrameLease>,
    in_flight: Option<FrameLease>,
    shutdown: bool,
}

impl FrameSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `lease` as the pending frame.
    ///
    /// Returns the pending lease it replaced, or gives `lease` straight back
    /// when the slots are shut down.
    pub fn offer(&mut self, lease: FrameLease) -> Result<Option<FrameLease>, FrameLease> {
        if self.shutdown {
            return Err(lease);
        }
        Ok(self.pending.replace(lease))
    }

    /// Move the pending frame in flight when nothing is being detected.
    ///
    /// Returns the frame to hand to the detector.
    pub fn promote(&mut self) -> Option<Frame> {
        if self.shutdown || self.in_flight.is_some() {
            return None;
        }
        let lease = self.pending.take()?;
        let frame = lease.frame().cloned();
        self.in_flight = Some(lease);
        frame
    }

    /// Clear the in-flight slot, returning the finished lease.
    pub fn complete(&mut self) -> Option<FrameLease> {
        self.in_flight.take()
    }

    /// Stop accepting frames. Returns whether this call did the shutdown,
    /// and the pending lease that will never be dispatched.
    pub fn shut_down(&mut self) -> (bool, Option<FrameLease>) {
        let first = !self.shutdown;
        self.shutdown = true;
        (first, self.pending.take())
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight.as_ref().and_then(FrameLease::sequence)
    }

    pub fn pending(&self) -> Option<u64> {
        self.pending.as_ref().and_then(FrameLease::sequence)
    }
}
