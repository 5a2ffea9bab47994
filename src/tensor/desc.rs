use super::dtype::DType;
use crate::utils::error::{BridgeError, Result};

/// Layout of a tensor over its storage: shape, element strides and a starting
/// element offset, all in units of elements rather than bytes.
///
/// The element count and byte size of every descriptor fit in `usize`: shapes
/// from outside the crate go through [`TensorDesc::try_new`] or
/// [`TensorDesc::reshape`], which check both.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorDesc {
    dims: Vec<usize>,
    strides: Vec<usize>,
    offset: usize,
    data_type: DType,
}

impl TensorDesc {
    /// Row-major contiguous layout for a shape that is known to fit.
    pub(crate) fn new(dims: Vec<usize>, data_type: DType) -> Self {
        let strides = Self::compute_strides(&dims);
        Self {
            dims,
            strides,
            offset: 0,
            data_type,
        }
    }

    /// Row-major contiguous layout, rejecting shapes whose element count or
    /// byte size overflows.
    pub fn try_new(dims: Vec<usize>, data_type: DType) -> Result<Self> {
        let elements = Self::element_count(&dims)?;
        elements
            .checked_mul(data_type.size_in_bytes())
            .ok_or_else(|| BridgeError::range_error(format!("{dims:?}"), "tensor shape"))?;
        Ok(Self::new(dims, data_type))
    }

    /// Product of `dims`, or a `RangeError` when it does not fit in `usize`.
    pub fn element_count(dims: &[usize]) -> Result<usize> {
        dims.iter()
            .try_fold(1usize, |count, &dim| count.checked_mul(dim))
            .ok_or_else(|| BridgeError::range_error(format!("{dims:?}"), "tensor shape"))
    }

    pub fn data_type(&self) -> DType {
        self.data_type
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.num_elements() * self.data_type.size_in_bytes()
    }

    // Axes of extent 1 never advance, so their stride is irrelevant.
    pub fn is_contiguous(&self) -> bool {
        let expected = Self::compute_strides(&self.dims);
        self.dims
            .iter()
            .zip(self.strides.iter().zip(expected.iter()))
            .all(|(dim, (actual, wanted))| *dim <= 1 || actual == wanted)
    }

    /// Same elements under a new shape. Only valid for contiguous layouts.
    pub fn reshape(&self, new_dims: Vec<usize>) -> Result<Self> {
        let new_elements = Self::element_count(&new_dims)?;
        if new_elements != self.num_elements() {
            return Err(BridgeError::LengthMismatch {
                declared: new_elements,
                actual: self.num_elements(),
            });
        }

        let mut desc = Self::new(new_dims, self.data_type);
        desc.offset = self.offset;
        Ok(desc)
    }

    /// Reverse the axis order without moving any element.
    pub fn transposed(&self) -> Self {
        Self {
            dims: self.dims.iter().rev().copied().collect(),
            strides: self.strides.iter().rev().copied().collect(),
            offset: self.offset,
            data_type: self.data_type,
        }
    }

    pub fn with_data_type(&self, data_type: DType) -> Self {
        Self::new(self.dims.clone(), data_type)
    }

    /// Storage element index of the `logical`-th element in row-major order.
    pub fn storage_index(&self, logical: usize) -> usize {
        let idxs = Self::unravel(logical, &self.dims);
        self.offset + Self::offset_of(&idxs, &self.strides)
    }

    pub fn compute_strides(dims: &[usize]) -> Vec<usize> {
        let mut s = vec![1; dims.len()];
        for i in (0..dims.len().saturating_sub(1)).rev() {
            s[i] = s[i + 1] * dims[i + 1];
        }
        s
    }

    pub fn unravel(idx: usize, dims: &[usize]) -> Vec<usize> {
        let mut rem = idx;
        dims.iter()
            .rev()
            .map(|dim| {
                let c = rem % dim;
                rem /= dim;
                c
            })
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    pub fn offset_of(idxs: &[usize], strides: &[usize]) -> usize {
        idxs.iter().zip(strides.iter()).map(|(i, s)| i * s).sum()
    }
}
