use std::{
    ops::Range,
    sync::{Arc, Weak},
};

use parking_lot::RwLock;

use crate::{
    codec::{FromHost, ToHost},
    handle::LiveToken,
    host::HostValue,
    tensor::{DType, Element, TensorStorage, dtype::dispatch_dtype},
    utils::{
        bytes::{bytes_to_elements, elements_to_bytes},
        error::{BridgeError, Result},
    },
};

/// Host fixed-width array kinds, one per dtype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    Int8Array,
    Uint8Array,
    Int16Array,
    Uint16Array,
    Int32Array,
    Uint32Array,
    BigInt64Array,
    BigUint64Array,
    Float32Array,
    Float64Array,
}

impl TypedArrayKind {
    pub fn for_dtype(dtype: DType) -> Self {
        match dtype {
            DType::Int8 => TypedArrayKind::Int8Array,
            DType::Uint8 => TypedArrayKind::Uint8Array,
            DType::Int16 => TypedArrayKind::Int16Array,
            DType::Uint16 => TypedArrayKind::Uint16Array,
            DType::Int32 => TypedArrayKind::Int32Array,
            DType::Uint32 => TypedArrayKind::Uint32Array,
            DType::Int64 => TypedArrayKind::BigInt64Array,
            DType::Uint64 => TypedArrayKind::BigUint64Array,
            DType::Float32 => TypedArrayKind::Float32Array,
            DType::Float64 => TypedArrayKind::Float64Array,
        }
    }

    pub fn dtype(self) -> DType {
        match self {
            TypedArrayKind::Int8Array => DType::Int8,
            TypedArrayKind::Uint8Array => DType::Uint8,
            TypedArrayKind::Int16Array => DType::Int16,
            TypedArrayKind::Uint16Array => DType::Uint16,
            TypedArrayKind::Int32Array => DType::Int32,
            TypedArrayKind::Uint32Array => DType::Uint32,
            TypedArrayKind::BigInt64Array => DType::Int64,
            TypedArrayKind::BigUint64Array => DType::Uint64,
            TypedArrayKind::Float32Array => DType::Float32,
            TypedArrayKind::Float64Array => DType::Float64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypedArrayKind::Int8Array => "Int8Array",
            TypedArrayKind::Uint8Array => "Uint8Array",
            TypedArrayKind::Int16Array => "Int16Array",
            TypedArrayKind::Uint16Array => "Uint16Array",
            TypedArrayKind::Int32Array => "Int32Array",
            TypedArrayKind::Uint32Array => "Uint32Array",
            TypedArrayKind::BigInt64Array => "BigInt64Array",
            TypedArrayKind::BigUint64Array => "BigUint64Array",
            TypedArrayKind::Float32Array => "Float32Array",
            TypedArrayKind::Float64Array => "Float64Array",
        }
    }

    pub fn bytes_per_element(self) -> usize {
        self.dtype().size_in_bytes()
    }
}

/// How a typed array relates to native memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewPolicy {
    /// Reads and writes go straight to tensor storage owned by a live handle.
    Alias,
    /// The array owns its bytes; the native source may already be gone.
    Copy,
}

#[derive(Clone, Debug)]
enum Backing {
    Owned(Arc<RwLock<Box<[u8]>>>),
    Shared(SharedBacking),
}

#[derive(Clone, Debug)]
struct SharedBacking {
    handle_id: u64,
    liveness: Weak<LiveToken>,
    storage: Weak<TensorStorage>,
    range: Range<usize>,
}

/// Host typed array. Clones share the same backing, like host object references.
#[derive(Clone, Debug)]
pub struct TypedArray {
    kind: TypedArrayKind,
    backing: Backing,
}

impl TypedArray {
    /// Host-owned array holding `values`, as the host would build with `new Float32Array([...])`.
    pub fn from_slice<T: Element>(values: &[T]) -> Self {
        Self::from_bytes(TypedArrayKind::for_dtype(T::DTYPE), elements_to_bytes(values))
    }

    pub(crate) fn from_bytes(kind: TypedArrayKind, bytes: Box<[u8]>) -> Self {
        Self {
            kind,
            backing: Backing::Owned(Arc::new(RwLock::new(bytes))),
        }
    }

    pub(crate) fn shared(
        kind: TypedArrayKind,
        handle_id: u64,
        liveness: &Arc<LiveToken>,
        storage: &Arc<TensorStorage>,
        range: Range<usize>,
    ) -> Self {
        Self {
            kind,
            backing: Backing::Shared(SharedBacking {
                handle_id,
                liveness: Arc::downgrade(liveness),
                storage: Arc::downgrade(storage),
                range,
            }),
        }
    }

    pub fn kind(&self) -> TypedArrayKind {
        self.kind
    }

    pub fn policy(&self) -> ViewPolicy {
        match self.backing {
            Backing::Owned(_) => ViewPolicy::Copy,
            Backing::Shared(_) => ViewPolicy::Alias,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.policy() == ViewPolicy::Alias
    }

    pub fn byte_len(&self) -> usize {
        match &self.backing {
            Backing::Owned(bytes) => bytes.read().len(),
            Backing::Shared(shared) => shared.range.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.byte_len() / self.kind.bytes_per_element()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the memory behind the array can still be touched.
    pub fn is_accessible(&self) -> bool {
        self.with_bytes(|_| ()).is_ok()
    }

    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        match &self.backing {
            Backing::Owned(bytes) => Ok(f(&bytes.read())),
            Backing::Shared(shared) => {
                let (_live, storage) = shared.upgrade()?;
                let data = storage.read();
                Ok(f(&data[shared.range.clone()]))
            }
        }
    }

    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        match &self.backing {
            Backing::Owned(bytes) => Ok(f(&mut bytes.write())),
            Backing::Shared(shared) => {
                let (_live, storage) = shared.upgrade()?;
                let mut data = storage.write();
                Ok(f(&mut data[shared.range.clone()]))
            }
        }
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.expect_dtype(T::DTYPE)?;
        self.with_bytes(bytes_to_elements::<T>)
    }

    pub fn get(&self, index: usize) -> Result<HostValue> {
        let range = self.element_range(index)?;
        let dtype = self.kind.dtype();
        self.with_bytes(|bytes| dispatch_dtype!(dtype, T => T::read_ne(&bytes[range]).to_host()))
    }

    /// Store one host value, converted with the element codec before any byte changes.
    pub fn set(&self, index: usize, value: &HostValue) -> Result<()> {
        let range = self.element_range(index)?;
        dispatch_dtype!(self.kind.dtype(), T => {
            let element = T::from_host(value)?;
            self.with_bytes_mut(|bytes| element.write_ne(&mut bytes[range]))
        })
    }

    pub fn to_host_values(&self) -> Result<Vec<HostValue>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    pub(crate) fn expect_dtype(&self, dtype: DType) -> Result<()> {
        if self.kind.dtype() != dtype {
            return Err(BridgeError::DtypeMismatch {
                expected: dtype,
                found: self.kind.dtype(),
            });
        }
        Ok(())
    }

    fn element_range(&self, index: usize) -> Result<Range<usize>> {
        if index >= self.len() {
            return Err(BridgeError::range_error(index, "typed array index"));
        }
        let width = self.kind.bytes_per_element();
        Ok(index * width..(index + 1) * width)
    }
}

impl SharedBacking {
    // The liveness token is checked first: an alias handle may keep the storage
    // alive after this view's own handle was disposed.
    fn upgrade(&self) -> Result<(Arc<LiveToken>, Arc<TensorStorage>)> {
        let disposed = BridgeError::UseAfterDispose { id: self.handle_id };
        let live = self.liveness.upgrade().ok_or_else(|| disposed.clone())?;
        let storage = self.storage.upgrade().ok_or(disposed)?;
        Ok((live, storage))
    }
}

impl PartialEq for TypedArray {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (self.with_bytes(<[u8]>::to_vec), other.with_bytes(<[u8]>::to_vec)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tensor::MemoryTracker, utils::error::ErrorKind};

    #[test]
    fn owned_array_reads_and_writes() {
        let array = TypedArray::from_slice(&[1i16, -2, 3]);
        assert_eq!(array.kind(), TypedArrayKind::Int16Array);
        assert_eq!(array.policy(), ViewPolicy::Copy);
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(1).unwrap(), HostValue::number(-2));

        let alias = array.clone();
        alias.set(1, &HostValue::number(20)).unwrap();
        assert_eq!(array.to_vec::<i16>().unwrap(), vec![1, 20, 3]);
    }

    #[test]
    fn set_rejects_bad_values_without_writing() {
        let array = TypedArray::from_slice(&[1u8, 2]);
        let err = array.set(0, &HostValue::number(256)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        let err = array.set(5, &HostValue::number(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        assert_eq!(array.to_vec::<u8>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn wide_kinds_use_bigints() {
        let array = TypedArray::from_slice(&[u64::MAX]);
        assert_eq!(array.kind(), TypedArrayKind::BigUint64Array);
        assert_eq!(array.get(0).unwrap(), HostValue::bigint(u64::MAX));
        assert_eq!(
            array.set(0, &HostValue::number(1)).unwrap_err().kind(),
            ErrorKind::TypeError
        );
    }

    #[test]
    fn to_vec_checks_kind() {
        let array = TypedArray::from_slice(&[1.0f64]);
        assert_eq!(
            array.to_vec::<f32>().unwrap_err().kind(),
            ErrorKind::DtypeMismatch
        );
    }

    #[test]
    fn shared_view_fails_fast_once_token_is_gone() {
        let tracker = Arc::new(MemoryTracker::new(u64::MAX));
        let storage = TensorStorage::from_bytes(elements_to_bytes(&[1.0f32, 2.0]), &tracker).unwrap();
        let token = Arc::new(LiveToken::new(7));
        let view = TypedArray::shared(TypedArrayKind::Float32Array, 7, &token, &storage, 0..8);

        assert!(view.is_shared());
        view.set(0, &HostValue::number(5)).unwrap();
        assert_eq!(bytes_to_elements::<f32>(&storage.read()), vec![5.0, 2.0]);

        drop(token);
        assert_eq!(
            view.to_vec::<f32>().unwrap_err(),
            BridgeError::UseAfterDispose { id: 7 }
        );
        assert!(!view.is_accessible());
        // length stays observable without touching memory
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn equality_compares_kind_and_contents() {
        assert_eq!(
            TypedArray::from_slice(&[1u32, 2]),
            TypedArray::from_slice(&[1u32, 2])
        );
        assert_ne!(
            TypedArray::from_slice(&[1u32, 2]),
            TypedArray::from_slice(&[1i32, 2])
        );
    }
}
