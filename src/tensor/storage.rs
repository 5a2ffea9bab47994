use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::memory_tracker::{Allocation, MemoryTracker};
use crate::utils::error::Result;

/// Native tensor bytes. Owns its tracker reservation, so the byte-usage counter
/// drops by exactly `len_bytes()` when the last reference goes away.
pub struct TensorStorage {
    data: RwLock<Box<[u8]>>,
    allocation: Allocation,
}

impl TensorStorage {
    /// Take ownership of `bytes`, charging them to `tracker` first.
    pub fn from_bytes(bytes: Box<[u8]>, tracker: &Arc<MemoryTracker>) -> Result<Arc<Self>> {
        let allocation = tracker.reserve(bytes.len() as u64)?;
        Ok(Arc::new(Self {
            data: RwLock::new(bytes),
            allocation,
        }))
    }

    /// `len` zero bytes. The reservation is made before anything is allocated.
    pub fn zeroed(len: usize, tracker: &Arc<MemoryTracker>) -> Result<Arc<Self>> {
        let allocation = tracker.reserve(len as u64)?;
        Ok(Arc::new(Self {
            data: RwLock::new(vec![0u8; len].into_boxed_slice()),
            allocation,
        }))
    }

    pub fn len_bytes(&self) -> usize {
        self.allocation.size() as usize
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write()
    }
}

impl std::fmt::Debug for TensorStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorStorage")
            .field("len_bytes", &self.len_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_and_releases_tracker() {
        let tracker = Arc::new(MemoryTracker::new(u64::MAX));
        let storage = TensorStorage::from_bytes(vec![1, 2, 3].into_boxed_slice(), &tracker).unwrap();
        assert_eq!(tracker.get_current(), 3);

        let alias = Arc::clone(&storage);
        drop(storage);
        assert_eq!(tracker.get_current(), 3);
        assert_eq!(alias.read()[2], 3);

        drop(alias);
        assert_eq!(tracker.get_current(), 0);
    }

    #[test]
    fn zeroed_is_rejected_before_allocating() {
        let tracker = Arc::new(MemoryTracker::new(16));
        let err = TensorStorage::zeroed(usize::MAX, &tracker).unwrap_err();
        assert_eq!(err.kind(), crate::utils::error::ErrorKind::OutOfMemory);
        assert_eq!(tracker.get_current(), 0);

        let storage = TensorStorage::zeroed(16, &tracker).unwrap();
        assert!(storage.read().iter().all(|b| *b == 0));
    }

    #[test]
    fn writes_are_visible_to_readers() {
        let tracker = Arc::new(MemoryTracker::new(u64::MAX));
        let storage = TensorStorage::from_bytes(vec![0u8; 4].into_boxed_slice(), &tracker).unwrap();
        storage.write()[1] = 9;
        assert_eq!(&storage.read()[..], &[0, 9, 0, 0]);
    }
}
