use num_bigint::BigInt;

use crate::{handle::Handle, view::TypedArray};

/// The subset of the host runtime's value system the boundary reads and produces.
///
/// Host numbers are IEEE doubles, host big integers are arbitrary precision, and
/// `External` is the opaque object the host holds for a native-owned handle.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(BigInt),
    String(String),
    Object(HostObject),
    TypedArray(TypedArray),
    External(Handle),
}

impl HostValue {
    pub fn number(value: impl Into<f64>) -> Self {
        HostValue::Number(value.into())
    }

    pub fn bigint(value: impl Into<BigInt>) -> Self {
        HostValue::BigInt(value.into())
    }

    /// Name reported in type errors, matching the host's `typeof` where one exists.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::BigInt(_) => "bigint",
            HostValue::String(_) => "string",
            HostValue::Object(_) | HostValue::External(_) => "object",
            HostValue::TypedArray(array) => array.kind().name(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            HostValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_typed_array(&self) -> Option<&TypedArray> {
        match self {
            HostValue::TypedArray(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            HostValue::External(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(value)
    }
}

impl From<HostObject> for HostValue {
    fn from(value: HostObject) -> Self {
        HostValue::Object(value)
    }
}

impl From<TypedArray> for HostValue {
    fn from(value: TypedArray) -> Self {
        HostValue::TypedArray(value)
    }
}

impl From<Handle> for HostValue {
    fn from(value: Handle) -> Self {
        HostValue::External(value)
    }
}

/// Host key-value object. Keys enumerate in insertion order; equality ignores order.
#[derive(Clone, Debug, Default)]
pub struct HostObject {
    entries: Vec<(String, HostValue)>,
}

impl HostObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`. Overwriting keeps the key's original position.
    pub fn insert(&mut self, key: impl Into<String>, value: HostValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}
