use thiserror::Error;

use crate::tensor::DType;

/// Coarse classification of a [`BridgeError`], mirroring the error names the host sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeError,
    RangeError,
    EncodingError,
    LengthMismatch,
    MissingField,
    InvalidHandle,
    UseAfterDispose,
    DtypeMismatch,
    NotContiguous,
    OutOfMemory,
    UnknownExport,
    InvalidConfig,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("TypeError: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("RangeError: {value} is outside the range of {target}")]
    RangeError { value: String, target: &'static str },

    #[error("EncodingError: invalid UTF-8 after {valid_up_to} bytes")]
    EncodingError { valid_up_to: usize },

    #[error("LengthMismatch: declared {declared} elements but the buffer holds {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("MissingFieldError: required field `{field}` is absent")]
    MissingField { field: String },

    #[error("InvalidHandle: handle {id} is not known to this registry")]
    InvalidHandle { id: u64 },

    #[error("UseAfterDispose: handle {id} was already disposed")]
    UseAfterDispose { id: u64 },

    #[error("DtypeMismatch: expected {expected:?}, found {found:?}")]
    DtypeMismatch { expected: DType, found: DType },

    #[error("NotContiguous: tensor behind handle {id} must be made contiguous first")]
    NotContiguous { id: u64 },

    #[error(
        "Out of memory: tried to allocate {requested} bytes when {used} of {maximum} bytes are used"
    )]
    OutOfMemory {
        requested: u64,
        used: u64,
        maximum: u64,
    },

    #[error("Unknown export: {0}")]
    UnknownExport(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::TypeError { .. } => ErrorKind::TypeError,
            BridgeError::RangeError { .. } => ErrorKind::RangeError,
            BridgeError::EncodingError { .. } => ErrorKind::EncodingError,
            BridgeError::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            BridgeError::MissingField { .. } => ErrorKind::MissingField,
            BridgeError::InvalidHandle { .. } => ErrorKind::InvalidHandle,
            BridgeError::UseAfterDispose { .. } => ErrorKind::UseAfterDispose,
            BridgeError::DtypeMismatch { .. } => ErrorKind::DtypeMismatch,
            BridgeError::NotContiguous { .. } => ErrorKind::NotContiguous,
            BridgeError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            BridgeError::UnknownExport(_) => ErrorKind::UnknownExport,
            BridgeError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    pub(crate) fn type_error(expected: impl Into<String>, got: impl Into<String>) -> Self {
        BridgeError::TypeError {
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub(crate) fn range_error(value: impl ToString, target: &'static str) -> Self {
        BridgeError::RangeError {
            value: value.to_string(),
            target,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            BridgeError::UseAfterDispose { id: 3 }.kind(),
            ErrorKind::UseAfterDispose
        );
        assert_eq!(
            BridgeError::range_error(300, "i8").kind(),
            ErrorKind::RangeError
        );
    }

    #[test]
    fn messages_name_the_host_error() {
        let err = BridgeError::MissingField {
            field: "c".to_string(),
        };
        assert_eq!(err.to_string(), "MissingFieldError: required field `c` is absent");
    }
}
