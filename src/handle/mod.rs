mod handle;
mod registry;
mod wrapped;

pub use handle::{Handle, HandleKind, LiveToken};
pub use registry::{HandleRegistry, NativeObject};
pub use wrapped::{WrappedRecord, WrappedStruct};
