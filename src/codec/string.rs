use super::{FromHost, ToHost};
use crate::{
    host::HostValue,
    utils::error::{BridgeError, Result},
};

/// UTF-8 bytes owned by the native side for the duration of one call.
///
/// Dropping the value releases the buffer; nothing retains it past the call
/// unless the caller moves it somewhere longer lived.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeString {
    bytes: Box<[u8]>,
}

impl NativeString {
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Concatenate the parts' bytes in order into one new buffer.
    pub fn concat(parts: &[NativeString]) -> Self {
        let total = parts.iter().map(NativeString::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for part in parts {
            bytes.extend_from_slice(part.as_bytes());
        }
        Self::from_bytes(bytes)
    }

    /// Decode the bytes into a host string.
    pub fn to_host(&self) -> Result<HostValue> {
        self.to_str().map(|s| HostValue::String(s.to_string()))
    }

    pub fn to_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes).map_err(|e| BridgeError::EncodingError {
            valid_up_to: e.valid_up_to(),
        })
    }
}

impl FromHost for NativeString {
    fn from_host(value: &HostValue) -> Result<Self> {
        match value {
            HostValue::String(s) => Ok(Self::from_bytes(s.as_bytes())),
            other => Err(BridgeError::type_error("string", other.type_name())),
        }
    }
}

impl FromHost for String {
    fn from_host(value: &HostValue) -> Result<Self> {
        NativeString::from_host(value)?.to_str().map(str::to_string)
    }
}

impl ToHost for String {
    fn to_host(self) -> HostValue {
        HostValue::String(self)
    }
}

impl ToHost for &str {
    fn to_host(self) -> HostValue {
        HostValue::String(self.to_string())
    }
}
