use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use once_cell::sync::Lazy;
use tracing::{debug, instrument, trace, warn};

use super::{config::BridgeConfig, exports};
use crate::{
    codec::NativeRecord,
    handle::{Handle, HandleRegistry, NativeObject, WrappedStruct},
    host::HostValue,
    tensor::{DType, Element, MemoryTracker, Tensor, TensorDesc},
    utils::error::{BridgeError, Result},
    view::{TypedArray, ViewBuilder},
};

static GLOBAL: Lazy<Bridge> = Lazy::new(Bridge::default);

/// Native side of the host boundary: owns the handle table and the byte-usage
/// counter every native allocation is charged to.
pub struct Bridge {
    config: BridgeConfig,
    tracker: Arc<MemoryTracker>,
    registry: HandleRegistry,
    row_major: AtomicBool,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let config = config.build()?;
        debug!(
            memory_limit = config.memory_limit,
            finalizer_reclaims = config.finalizer_reclaims,
            row_major = config.row_major,
            "bridge created"
        );

        Ok(Self {
            tracker: Arc::new(MemoryTracker::new(config.memory_limit)),
            registry: HandleRegistry::new(),
            row_major: AtomicBool::new(config.row_major),
            config,
        })
    }

    /// Process-wide bridge with the default configuration.
    pub fn global() -> &'static Bridge {
        &GLOBAL
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Dispatch a host call through the export table.
    pub fn call(&self, name: &str, args: &[HostValue]) -> Result<HostValue> {
        exports::call(self, name, args)
    }

    /// Bytes held by live native allocations.
    pub fn bytes_used(&self) -> u64 {
        self.tracker.get_current()
    }

    pub fn live_count(&self) -> usize {
        self.registry.live_count()
    }

    pub fn live_handles(&self) -> Vec<Handle> {
        self.registry.live_handles()
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.registry.is_live(handle)
    }

    /* Layout convention */

    /// Whether shapes cross the boundary slowest axis first (the default).
    /// Under the column-major convention the host lists axes fastest first, so
    /// shapes are reversed on the way in and out.
    pub fn is_row_major(&self) -> bool {
        self.row_major.load(Ordering::Acquire)
    }

    pub fn set_row_major(&self, row_major: bool) {
        self.row_major.store(row_major, Ordering::Release);
        debug!(row_major, "layout convention changed");
    }

    // Host shape to native dims: negative extents are rejected, then the
    // layout convention decides the axis order.
    fn native_dims(&self, shape: &[i64]) -> Result<Vec<usize>> {
        let mut dims = shape
            .iter()
            .map(|&d| usize::try_from(d).map_err(|_| BridgeError::range_error(d, "tensor dimension")))
            .collect::<Result<Vec<_>>>()?;
        if !self.is_row_major() {
            dims.reverse();
        }
        Ok(dims)
    }

    /* Tensors */

    /// Copy `elements` into a new 1-D tensor. `length` is what the host declared.
    #[instrument(level = "debug", skip(self, elements), fields(dtype = ?T::DTYPE))]
    pub fn tensor_from_buffer<T: Element>(&self, length: i64, elements: &[T]) -> Result<Handle> {
        let declared =
            usize::try_from(length).map_err(|_| BridgeError::range_error(length, "tensor length"))?;
        if declared != elements.len() {
            return Err(BridgeError::LengthMismatch {
                declared,
                actual: elements.len(),
            });
        }

        let tensor = Tensor::from_elements(elements, &self.tracker)?;
        Ok(self.register_tensor(tensor))
    }

    /// Zero-filled float32 tensor of `shape`, given in the host's axis order.
    #[instrument(level = "debug", skip(self))]
    pub fn create_tensor(&self, shape: &[i64]) -> Result<Handle> {
        let desc = TensorDesc::try_new(self.native_dims(shape)?, DType::Float32)?;
        let tensor = Tensor::zeros(desc, &self.tracker)?;
        Ok(self.register_tensor(tensor))
    }

    // Crate-only: a strong clone keeps the storage charged after a dispose.
    pub(crate) fn tensor(&self, handle: Handle) -> Result<Tensor> {
        self.registry.tensor(handle).map(|(tensor, _)| tensor)
    }

    pub fn dtype(&self, handle: Handle) -> Result<DType> {
        Ok(self.tensor(handle)?.dtype())
    }

    pub fn elements(&self, handle: Handle) -> Result<usize> {
        Ok(self.tensor(handle)?.num_elements())
    }

    pub fn bytes(&self, handle: Handle) -> Result<usize> {
        Ok(self.tensor(handle)?.size_in_bytes())
    }

    pub fn ndim(&self, handle: Handle) -> Result<usize> {
        Ok(self.tensor(handle)?.desc().ndim())
    }

    /// Dims in the host's axis order.
    pub fn shape(&self, handle: Handle) -> Result<Vec<usize>> {
        let mut dims = self.tensor(handle)?.desc().dims().to_vec();
        if !self.is_row_major() {
            dims.reverse();
        }
        Ok(dims)
    }

    pub fn scalar(&self, handle: Handle) -> Result<HostValue> {
        self.tensor(handle)?.scalar()
    }

    /// New handle over the same storage when the tensor is already contiguous,
    /// otherwise over a reordered copy. The source handle stays valid.
    #[instrument(level = "debug", skip(self, handle), fields(handle = %handle))]
    pub fn as_contiguous(&self, handle: Handle) -> Result<Handle> {
        let tensor = self.tensor(handle)?;
        let contiguous = tensor.as_contiguous(&self.tracker)?;
        Ok(self.register_tensor(contiguous))
    }

    #[instrument(level = "debug", skip(self, handle), fields(handle = %handle))]
    pub fn reshape(&self, handle: Handle, shape: &[i64]) -> Result<Handle> {
        let tensor = self.tensor(handle)?;
        let dims = self.native_dims(shape)?;
        let reshaped = tensor.reshape(dims, &self.tracker)?;
        Ok(self.register_tensor(reshaped))
    }

    pub fn transpose(&self, handle: Handle) -> Result<Handle> {
        let transposed = self.tensor(handle)?.transpose();
        Ok(self.register_tensor(transposed))
    }

    pub fn flatten(&self, handle: Handle) -> Result<Handle> {
        let flat = self.tensor(handle)?.flatten(&self.tracker)?;
        Ok(self.register_tensor(flat))
    }

    pub fn copy(&self, handle: Handle) -> Result<Handle> {
        let copy = self.tensor(handle)?.deep_copy(&self.tracker)?;
        Ok(self.register_tensor(copy))
    }

    #[instrument(level = "debug", skip(self, handle), fields(handle = %handle))]
    pub fn astype(&self, handle: Handle, tag: i64) -> Result<Handle> {
        let dtype = DType::from_tag(tag).ok_or_else(|| BridgeError::range_error(tag, "dtype tag"))?;
        let converted = self.tensor(handle)?.astype(dtype, &self.tracker)?;
        Ok(self.register_tensor(converted))
    }

    /// Zero-copy view over the tensor behind `handle`.
    ///
    /// The view stays usable while `handle` is live and fails with
    /// `UseAfterDispose` afterwards.
    pub fn buffer(&self, handle: Handle, dtype: DType) -> Result<TypedArray> {
        let (tensor, liveness) = self.registry.tensor(handle)?;
        if tensor.dtype() != dtype {
            return Err(BridgeError::DtypeMismatch {
                expected: dtype,
                found: tensor.dtype(),
            });
        }

        ViewBuilder::alias_tensor(handle.id(), &tensor, &liveness)
    }

    pub fn buffer_of<T: Element>(&self, handle: Handle) -> Result<TypedArray> {
        self.buffer(handle, T::DTYPE)
    }

    pub fn float32_buffer(&self, handle: Handle) -> Result<TypedArray> {
        self.buffer_of::<f32>(handle)
    }

    fn register_tensor(&self, tensor: Tensor) -> Handle {
        let handle = self.registry.register(NativeObject::Tensor(tensor));
        trace!(%handle, bytes_used = self.bytes_used(), "tensor registered");
        handle
    }

    /* Wrapped structs */

    /// Move `record` behind a handle. Its fields stay readable through
    /// [`Bridge::accessor`] until the handle is disposed.
    pub fn wrap<R>(&self, record: R) -> Result<Handle>
    where
        R: NativeRecord + Send + Sync + 'static,
    {
        let wrapped = WrappedStruct::new(record, &self.tracker)?;
        Ok(self
            .registry
            .register(NativeObject::Wrapped(Arc::new(wrapped))))
    }

    pub fn accessor(&self, handle: Handle, field: &str) -> Result<HostValue> {
        self.registry.accessor(handle, field)
    }

    /// One field of a wrapped struct. Any other kind of handle is a `TypeError`.
    pub fn wrapped_field(&self, handle: Handle, field: &str) -> Result<HostValue> {
        self.registry
            .wrapped(handle)?
            .field(field)
            .ok_or_else(|| BridgeError::MissingField {
                field: field.to_string(),
            })
    }

    /* Lifecycle */

    /// Release the object behind `handle`. Repeating a dispose is a no-op.
    pub fn dispose(&self, handle: Handle) -> Result<()> {
        self.registry.dispose(handle)?;
        trace!(bytes_used = self.bytes_used(), "after dispose");
        Ok(())
    }

    /// Hook for host finalizers. Never fails; returns whether memory was reclaimed.
    pub fn finalize(&self, handle: Handle) -> bool {
        if !self.config.finalizer_reclaims {
            if self.registry.is_live(handle) {
                debug!(%handle, "finalizer left live handle for an explicit dispose");
            }
            return false;
        }

        self.registry.finalize(handle)
    }
}

impl Default for Bridge {
    fn default() -> Self {
        let config = BridgeConfig::default();
        Self {
            tracker: Arc::new(MemoryTracker::new(config.memory_limit)),
            registry: HandleRegistry::new(),
            row_major: AtomicBool::new(config.row_major),
            config,
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if !self.config.warn_on_leak {
            return;
        }

        for handle in self.registry.live_handles() {
            warn!(%handle, "handle still live when the bridge was dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    crate::native_record! {
        struct Pair {
            a: i32,
            b: i64,
        }
    }

    #[test]
    fn length_is_validated_before_allocating() {
        let bridge = Bridge::default();
        let err = bridge.tensor_from_buffer(3, &[1.0f32, 2.0]).unwrap_err();
        assert_eq!(
            err,
            BridgeError::LengthMismatch {
                declared: 3,
                actual: 2
            }
        );
        let err = bridge.tensor_from_buffer(-1, &[1.0f32]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        assert_eq!(bridge.bytes_used(), 0);
    }

    #[test]
    fn memory_limit_rejects_without_charging() {
        let bridge = Bridge::new(BridgeConfig::default().with_memory_limit(16)).unwrap();
        let first = bridge.tensor_from_buffer(2, &[1.0f64, 2.0]).unwrap();
        let err = bridge.tensor_from_buffer(1, &[3u8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert_eq!(bridge.bytes_used(), 16);

        bridge.dispose(first).unwrap();
        assert_eq!(bridge.bytes_used(), 0);
    }

    #[test]
    fn reshape_checks_element_count() {
        let bridge = Bridge::default();
        let handle = bridge.tensor_from_buffer(6, &[0i32; 6]).unwrap();
        let err = bridge.reshape(handle, &[4, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LengthMismatch);
        let err = bridge.reshape(handle, &[-2, -3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);

        let reshaped = bridge.reshape(handle, &[2, 3]).unwrap();
        assert_eq!(bridge.shape(reshaped).unwrap(), vec![2, 3]);
        assert_eq!(bridge.bytes_used(), 24);
    }

    #[test]
    fn reshape_rejects_overflowing_shapes() {
        let bridge = Bridge::default();
        let empty = bridge.tensor_from_buffer::<f32>(0, &[]).unwrap();
        let err = bridge.reshape(empty, &[1 << 32, 1 << 32]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        let err = bridge.create_tensor(&[i64::MAX, i64::MAX]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        assert_eq!(bridge.live_count(), 1);
        assert_eq!(bridge.bytes_used(), 0);
    }

    #[test]
    fn create_tensor_is_zero_filled_and_charged() {
        let bridge = Bridge::default();
        let handle = bridge.create_tensor(&[2, 3]).unwrap();
        assert_eq!(bridge.dtype(handle).unwrap(), DType::Float32);
        assert_eq!(bridge.shape(handle).unwrap(), vec![2, 3]);
        assert_eq!(bridge.bytes_used(), 24);
        assert_eq!(
            bridge.float32_buffer(handle).unwrap().to_vec::<f32>().unwrap(),
            vec![0.0; 6]
        );

        let err = bridge.create_tensor(&[2, -1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        bridge.dispose(handle).unwrap();
        assert_eq!(bridge.bytes_used(), 0);
    }

    #[test]
    fn column_major_reverses_host_shapes() {
        let bridge = Bridge::new(BridgeConfig {
            row_major: false,
            ..BridgeConfig::default()
        })
        .unwrap();
        assert!(!bridge.is_row_major());

        let handle = bridge.create_tensor(&[2, 3]).unwrap();
        assert_eq!(bridge.tensor(handle).unwrap().desc().dims(), &[3, 2]);
        assert_eq!(bridge.shape(handle).unwrap(), vec![2, 3]);

        let flat = bridge.tensor_from_buffer(6, &[0i32, 1, 2, 3, 4, 5]).unwrap();
        let matrix = bridge.reshape(flat, &[3, 2]).unwrap();
        assert_eq!(bridge.tensor(matrix).unwrap().desc().dims(), &[2, 3]);
        assert_eq!(bridge.shape(matrix).unwrap(), vec![3, 2]);

        bridge.set_row_major(true);
        assert_eq!(bridge.shape(matrix).unwrap(), vec![2, 3]);
    }

    #[test]
    fn wrapped_field_rejects_tensor_handles() {
        let bridge = Bridge::default();
        let tensor = bridge.tensor_from_buffer(1, &[1.0f32]).unwrap();
        let err = bridge.wrapped_field(tensor, "a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);

        let pair = bridge.wrap(Pair { a: 1, b: 2 }).unwrap();
        assert_eq!(bridge.wrapped_field(pair, "b").unwrap(), HostValue::bigint(2));
        assert_eq!(
            bridge.wrapped_field(pair, "c").unwrap_err().kind(),
            ErrorKind::MissingField
        );
    }

    #[test]
    fn astype_rejects_reserved_tags() {
        let bridge = Bridge::default();
        let handle = bridge.tensor_from_buffer(1, &[1.5f32]).unwrap();
        for tag in [0, 3, 12, -1] {
            let err = bridge.astype(handle, tag).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RangeError);
        }

        let as_int = bridge.astype(handle, DType::Int32.tag().into()).unwrap();
        assert_eq!(bridge.dtype(as_int).unwrap(), DType::Int32);
        assert_eq!(bridge.scalar(as_int).unwrap(), HostValue::number(1));
    }

    #[test]
    fn wrapped_records_count_towards_bytes_used() {
        let bridge = Bridge::default();
        let handle = bridge.wrap(Pair { a: 100, b: 2000 }).unwrap();
        assert_eq!(bridge.bytes_used(), std::mem::size_of::<Pair>() as u64);
        assert_eq!(bridge.accessor(handle, "a").unwrap(), HostValue::number(100));

        bridge.dispose(handle).unwrap();
        assert_eq!(bridge.bytes_used(), 0);
        assert_eq!(
            bridge.accessor(handle, "a").unwrap_err().kind(),
            ErrorKind::UseAfterDispose
        );
    }

    #[test]
    fn finalizer_respects_config() {
        let config = BridgeConfig {
            finalizer_reclaims: false,
            ..BridgeConfig::default()
        };
        let bridge = Bridge::new(config).unwrap();
        let handle = bridge.tensor_from_buffer(1, &[1u16]).unwrap();

        assert!(!bridge.finalize(handle));
        assert!(bridge.is_live(handle));
        bridge.dispose(handle).unwrap();
    }

    #[test]
    fn global_bridge_is_shared() {
        assert!(std::ptr::eq(Bridge::global(), Bridge::global()));
    }
}
