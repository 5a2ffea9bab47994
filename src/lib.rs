//! hostbridge - Native side of a garbage-collected host boundary
//!
//! Marshals primitives, strings and records between host values and native
//! types, and hands native tensors and structs to the host behind opaque handles
//! with explicit dispose and global byte accounting.

pub mod bridge;

pub mod codec;

pub mod handle;

pub mod host;

pub mod tensor;

pub mod utils;

pub mod view;

pub use bridge::{Bridge, BridgeConfig};
pub use codec::{FromHost, NativeRecord, ToHost};
pub use handle::{Handle, HandleKind};
pub use host::{HostObject, HostValue};
pub use tensor::{DType, Element};
pub use utils::error::{BridgeError, ErrorKind, Result};
pub use view::{TypedArray, TypedArrayKind, ViewPolicy};
