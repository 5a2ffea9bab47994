//! Conversions between host values and native values.
//!
//! Every conversion into native form is fallible and reports the host error kind
//! the call should surface; conversions back to the host never fail except for
//! string decoding, which lives on [`NativeString`].

pub mod numeric;
pub mod record;
pub mod string;

pub use numeric::NativeAdd;
pub use record::NativeRecord;
pub use string::NativeString;

use crate::{
    handle::Handle,
    host::{HostObject, HostValue},
    utils::error::{BridgeError, Result},
    view::TypedArray,
};

/// Decode a host value into its native representation.
pub trait FromHost: Sized {
    fn from_host(value: &HostValue) -> Result<Self>;
}

/// Encode a native value as a host value.
pub trait ToHost {
    fn to_host(self) -> HostValue;
}

impl FromHost for bool {
    fn from_host(value: &HostValue) -> Result<Self> {
        match value {
            HostValue::Bool(b) => Ok(*b),
            other => Err(BridgeError::type_error("boolean", other.type_name())),
        }
    }
}

impl ToHost for bool {
    fn to_host(self) -> HostValue {
        HostValue::Bool(self)
    }
}

impl ToHost for () {
    fn to_host(self) -> HostValue {
        HostValue::Undefined
    }
}

impl ToHost for HostValue {
    fn to_host(self) -> HostValue {
        self
    }
}

impl ToHost for HostObject {
    fn to_host(self) -> HostValue {
        HostValue::Object(self)
    }
}

impl FromHost for Handle {
    fn from_host(value: &HostValue) -> Result<Self> {
        value
            .as_handle()
            .ok_or_else(|| BridgeError::type_error("native handle", value.type_name()))
    }
}

impl ToHost for Handle {
    fn to_host(self) -> HostValue {
        HostValue::External(self)
    }
}

// Typed arrays are host objects, so decoding only clones the reference.
impl FromHost for TypedArray {
    fn from_host(value: &HostValue) -> Result<Self> {
        value
            .as_typed_array()
            .cloned()
            .ok_or_else(|| BridgeError::type_error("typed array", value.type_name()))
    }
}

impl ToHost for TypedArray {
    fn to_host(self) -> HostValue {
        HostValue::TypedArray(self)
    }
}
