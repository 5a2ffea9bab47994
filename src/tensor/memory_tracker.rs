use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tracing::error;

use crate::utils::error::{BridgeError, Result};

/// Running total of native bytes reachable through live handles.
pub struct MemoryTracker {
    maximum: u64,
    current: AtomicU64,
}

// Updates go through compare-and-swap so a rejected allocation never shows up in
// the counter, even briefly, and the counter never wraps below zero.

impl MemoryTracker {
    pub fn new(maximum: u64) -> Self {
        Self {
            maximum,
            current: AtomicU64::new(0),
        }
    }

    pub fn allocate(&self, size: u64) -> Result<()> {
        self.current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                prev.checked_add(size).filter(|new| *new <= self.maximum)
            })
            .map(|_| ())
            .map_err(|prev| BridgeError::OutOfMemory {
                requested: size,
                used: prev,
                maximum: self.maximum,
            })
    }

    pub fn deallocate(&self, size: u64) {
        let result = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                prev.checked_sub(size)
            });

        if let Err(prev) = result {
            error!(
                "Memory tracker underflow: releasing {} bytes when only {} are tracked",
                size, prev
            );
            debug_assert!(false, "memory tracker released more than it allocated");
            self.current.store(0, Ordering::Release);
        }
    }

    pub fn get_current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    pub fn get_available(&self) -> u64 {
        self.maximum.saturating_sub(self.get_current())
    }

    pub fn get_maximum(&self) -> u64 {
        self.maximum
    }

    /// Reserve `size` bytes, released again when the returned guard drops.
    pub fn reserve(self: &Arc<Self>, size: u64) -> Result<Allocation> {
        self.allocate(size)?;
        Ok(Allocation {
            tracker: Arc::clone(self),
            size,
        })
    }
}

/// Pairs one tracked allocation with exactly one release.
pub struct Allocation {
    tracker: Arc<MemoryTracker>,
    size: u64,
}

impl Allocation {
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.tracker.deallocate(self.size);
    }
}

impl std::fmt::Debug for Allocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocation").field("size", &self.size).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    #[test]
    fn reserve_and_release() {
        let tracker = Arc::new(MemoryTracker::new(1024));
        let a = tracker.reserve(400).unwrap();
        let b = tracker.reserve(24).unwrap();
        assert_eq!(tracker.get_current(), 424);
        assert_eq!(tracker.get_available(), 600);

        drop(a);
        assert_eq!(tracker.get_current(), 24);
        drop(b);
        assert_eq!(tracker.get_current(), 0);
    }

    #[test]
    fn over_limit_leaves_counter_untouched() {
        let tracker = Arc::new(MemoryTracker::new(100));
        let _held = tracker.reserve(60).unwrap();
        let err = tracker.reserve(41).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert_eq!(tracker.get_current(), 60);
    }

    #[test]
    fn overflow_is_rejected() {
        let tracker = MemoryTracker::new(u64::MAX);
        tracker.allocate(u64::MAX).unwrap();
        assert!(tracker.allocate(1).is_err());
        assert_eq!(tracker.get_current(), u64::MAX);
    }
}
