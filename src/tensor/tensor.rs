use std::sync::Arc;

use super::{
    desc::TensorDesc,
    dtype::{DType, Element, dispatch_dtype},
    memory_tracker::MemoryTracker,
    storage::TensorStorage,
};
use crate::{
    codec::ToHost,
    host::HostValue,
    utils::{
        bytes::{bytes_to_elements, elements_to_bytes},
        error::{BridgeError, Result},
    },
};

/// A layout over shared native storage.
///
/// Cloning a tensor aliases its storage; only the constructors and the copying
/// transforms (`as_contiguous` on a strided layout, `deep_copy`, `astype`) reserve
/// new bytes.
#[derive(Clone, Debug)]
pub struct Tensor {
    desc: TensorDesc,
    storage: Arc<TensorStorage>,
}

impl Tensor {
    /// Copy host-provided elements into a new contiguous 1-D tensor.
    pub fn from_elements<T: Element>(elements: &[T], tracker: &Arc<MemoryTracker>) -> Result<Self> {
        let desc = TensorDesc::new(vec![elements.len()], T::DTYPE);
        let storage = TensorStorage::from_bytes(elements_to_bytes(elements), tracker)?;
        Ok(Self { desc, storage })
    }

    /// Take ownership of raw bytes laid out contiguously for `desc`.
    pub fn from_bytes(desc: TensorDesc, bytes: Box<[u8]>, tracker: &Arc<MemoryTracker>) -> Result<Self> {
        if bytes.len() != desc.size_in_bytes() {
            return Err(BridgeError::LengthMismatch {
                declared: desc.num_elements(),
                actual: bytes.len() / desc.data_type().size_in_bytes(),
            });
        }
        let storage = TensorStorage::from_bytes(bytes, tracker)?;
        Ok(Self { desc, storage })
    }

    /// Zero-filled contiguous tensor of the given layout.
    pub fn zeros(desc: TensorDesc, tracker: &Arc<MemoryTracker>) -> Result<Self> {
        let storage = TensorStorage::zeroed(desc.size_in_bytes(), tracker)?;
        Ok(Self { desc, storage })
    }

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    pub fn dtype(&self) -> DType {
        self.desc.data_type()
    }

    pub fn num_elements(&self) -> usize {
        self.desc.num_elements()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.desc.size_in_bytes()
    }

    pub fn is_contiguous(&self) -> bool {
        self.desc.is_contiguous()
    }

    pub fn storage(&self) -> &Arc<TensorStorage> {
        &self.storage
    }

    pub fn shares_storage_with(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Byte range of a contiguous layout within its storage.
    pub fn byte_range(&self) -> Option<std::ops::Range<usize>> {
        if !self.is_contiguous() {
            return None;
        }
        let start = self.desc.offset() * self.dtype().size_in_bytes();
        Some(start..start + self.size_in_bytes())
    }

    /// Elements in logical row-major order, copied out of storage.
    pub fn logical_bytes(&self) -> Box<[u8]> {
        let data = self.storage.read();
        if let Some(range) = self.byte_range() {
            return Box::from(&data[range]);
        }

        let width = self.dtype().size_in_bytes();
        let mut out = Vec::with_capacity(self.size_in_bytes());
        for logical in 0..self.num_elements() {
            let start = self.desc.storage_index(logical) * width;
            out.extend_from_slice(&data[start..start + width]);
        }
        out.into_boxed_slice()
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if self.dtype() != T::DTYPE {
            return Err(BridgeError::DtypeMismatch {
                expected: T::DTYPE,
                found: self.dtype(),
            });
        }
        Ok(bytes_to_elements(&self.logical_bytes()))
    }

    /// Returns an alias when already contiguous, otherwise reorders into new storage.
    pub fn as_contiguous(&self, tracker: &Arc<MemoryTracker>) -> Result<Tensor> {
        if self.is_contiguous() {
            return Ok(self.clone());
        }
        self.deep_copy(tracker)
    }

    /// Always allocates, even for contiguous input.
    pub fn deep_copy(&self, tracker: &Arc<MemoryTracker>) -> Result<Tensor> {
        let desc = TensorDesc::new(self.desc.dims().to_vec(), self.dtype());
        Tensor::from_bytes(desc, self.logical_bytes(), tracker)
    }

    /// Alias of a contiguous tensor under a new shape; a strided tensor is copied first.
    pub fn reshape(&self, dims: Vec<usize>, tracker: &Arc<MemoryTracker>) -> Result<Tensor> {
        let count = TensorDesc::element_count(&dims)?;
        if count != self.num_elements() {
            return Err(BridgeError::LengthMismatch {
                declared: count,
                actual: self.num_elements(),
            });
        }

        let source = self.as_contiguous(tracker)?;
        let desc = source.desc.reshape(dims)?;
        Ok(Tensor {
            desc,
            storage: source.storage,
        })
    }

    pub fn flatten(&self, tracker: &Arc<MemoryTracker>) -> Result<Tensor> {
        self.reshape(vec![self.num_elements()], tracker)
    }

    pub fn transpose(&self) -> Tensor {
        Tensor {
            desc: self.desc.transposed(),
            storage: Arc::clone(&self.storage),
        }
    }

    pub fn astype(&self, dtype: DType, tracker: &Arc<MemoryTracker>) -> Result<Tensor> {
        if dtype == self.dtype() {
            return self.deep_copy(tracker);
        }

        let source = self.logical_bytes();
        let scalars = dispatch_dtype!(self.dtype(), S => {
            bytes_to_elements::<S>(&source)
                .into_iter()
                .map(Element::to_scalar)
                .collect::<Vec<_>>()
        });
        let bytes = dispatch_dtype!(dtype, D => {
            let converted: Vec<D> = scalars.into_iter().map(D::from_scalar).collect();
            elements_to_bytes(&converted)
        });

        Tensor::from_bytes(self.desc.with_data_type(dtype), bytes, tracker)
    }

    /// First logical element as a host value.
    pub fn scalar(&self) -> Result<HostValue> {
        if self.num_elements() == 0 {
            return Err(BridgeError::range_error(0, "non-empty tensor"));
        }

        let width = self.dtype().size_in_bytes();
        let start = self.desc.storage_index(0) * width;
        let data = self.storage.read();
        let bytes = &data[start..start + width];
        Ok(dispatch_dtype!(self.dtype(), T => T::read_ne(bytes).to_host()))
    }
}
