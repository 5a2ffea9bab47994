mod desc;
pub(crate) mod dtype;
mod memory_tracker;
mod storage;
mod tensor;

pub use desc::TensorDesc;
pub use dtype::{DType, Element, Scalar};
pub use memory_tracker::{Allocation, MemoryTracker};
pub use storage::TensorStorage;
pub use tensor::Tensor;
