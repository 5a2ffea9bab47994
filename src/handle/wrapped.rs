use std::sync::Arc;

use crate::{
    codec::NativeRecord,
    host::HostValue,
    tensor::{Allocation, MemoryTracker},
    utils::error::Result,
};

/// Object-safe view of a record that has been moved behind a handle.
pub trait WrappedRecord: Send + Sync + 'static {
    fn record_name(&self) -> &'static str;

    fn field(&self, name: &str) -> Option<HostValue>;
}

impl<T: NativeRecord + Send + Sync + 'static> WrappedRecord for T {
    fn record_name(&self) -> &'static str {
        T::NAME
    }

    fn field(&self, name: &str) -> Option<HostValue> {
        NativeRecord::field(self, name)
    }
}

/// An immutable native record owned by a handle. Its size is charged to the
/// byte-usage counter for as long as it lives.
pub struct WrappedStruct {
    record: Box<dyn WrappedRecord>,
    allocation: Allocation,
}

impl WrappedStruct {
    pub fn new<R>(record: R, tracker: &Arc<MemoryTracker>) -> Result<Self>
    where
        R: NativeRecord + Send + Sync + 'static,
    {
        let allocation = tracker.reserve(std::mem::size_of::<R>() as u64)?;
        Ok(Self {
            record: Box::new(record),
            allocation,
        })
    }

    pub fn record_name(&self) -> &'static str {
        self.record.record_name()
    }

    pub fn field(&self, name: &str) -> Option<HostValue> {
        self.record.field(name)
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.allocation.size()
    }
}

impl std::fmt::Debug for WrappedStruct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappedStruct")
            .field("record", &self.record_name())
            .field("size", &self.size_in_bytes())
            .finish()
    }
}
