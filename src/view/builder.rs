use std::sync::Arc;

use super::typed_array::{TypedArray, TypedArrayKind};
use crate::{
    handle::LiveToken,
    tensor::{Element, Tensor},
    utils::error::{BridgeError, Result},
};

/// Chooses between aliasing and copying when native memory goes out to the host.
///
/// - Data owned by a handle is aliased: the view reads and writes the tensor's
///   storage for as long as the handle is live, and fails with `UseAfterDispose`
///   afterwards.
/// - Data from a transient native slice is copied: nothing manages the slice's
///   lifetime once the call returns.
pub struct ViewBuilder;

impl ViewBuilder {
    pub fn copy_slice<T: Element>(slice: &[T]) -> TypedArray {
        TypedArray::from_slice(slice)
    }

    /// Copy of a tensor's elements in logical order. Works for any layout.
    pub fn copy_tensor(tensor: &Tensor) -> TypedArray {
        TypedArray::from_bytes(
            TypedArrayKind::for_dtype(tensor.dtype()),
            tensor.logical_bytes(),
        )
    }

    /// Zero-copy view over a handle-owned tensor.
    pub fn alias_tensor(
        handle_id: u64,
        tensor: &Tensor,
        liveness: &Arc<LiveToken>,
    ) -> Result<TypedArray> {
        let range = tensor
            .byte_range()
            .ok_or(BridgeError::NotContiguous { id: handle_id })?;

        Ok(TypedArray::shared(
            TypedArrayKind::for_dtype(tensor.dtype()),
            handle_id,
            liveness,
            tensor.storage(),
            range,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        tensor::MemoryTracker,
        utils::error::ErrorKind,
        view::typed_array::ViewPolicy,
    };

    #[test]
    fn slices_are_copied() {
        let source = vec![1u8, 2, 3];
        let view = ViewBuilder::copy_slice(&source);
        drop(source);
        assert_eq!(view.policy(), ViewPolicy::Copy);
        assert_eq!(view.to_vec::<u8>().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn alias_requires_contiguity() {
        let tracker = Arc::new(MemoryTracker::new(u64::MAX));
        let token = Arc::new(LiveToken::new(1));
        let tensor = Tensor::from_elements(&[0i32, 1, 2, 3], &tracker)
            .unwrap()
            .reshape(vec![2, 2], &tracker)
            .unwrap()
            .transpose();

        let err = ViewBuilder::alias_tensor(1, &tensor, &token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotContiguous);

        let copy = ViewBuilder::copy_tensor(&tensor);
        assert_eq!(copy.to_vec::<i32>().unwrap(), vec![0, 2, 1, 3]);
    }

    #[test]
    fn alias_shares_storage() {
        let tracker = Arc::new(MemoryTracker::new(u64::MAX));
        let token = Arc::new(LiveToken::new(2));
        let tensor = Tensor::from_elements(&[1.0f32, 2.0], &tracker).unwrap();
        let view = ViewBuilder::alias_tensor(2, &tensor, &token).unwrap();

        view.set(1, &crate::host::HostValue::number(9)).unwrap();
        assert_eq!(tensor.to_vec::<f32>().unwrap(), vec![1.0, 9.0]);
    }
}
