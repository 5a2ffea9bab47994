use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use parking_lot::Mutex;
use tracing::{debug, instrument, trace, warn};

use super::{
    handle::{Handle, HandleKind, LiveToken},
    wrapped::WrappedStruct,
};
use crate::{
    codec::ToHost,
    host::HostValue,
    tensor::Tensor,
    utils::error::{BridgeError, Result},
};

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

/// A native object the host can only reach through a handle.
#[derive(Clone, Debug)]
pub enum NativeObject {
    Tensor(Tensor),
    Wrapped(Arc<WrappedStruct>),
}

impl NativeObject {
    pub fn kind(&self) -> HandleKind {
        match self {
            NativeObject::Tensor(_) => HandleKind::Tensor,
            NativeObject::Wrapped(_) => HandleKind::WrappedStruct,
        }
    }
}

struct Entry {
    object: NativeObject,
    token: Arc<LiveToken>,
}

struct RegistryState {
    next_id: u64,
    entries: HashMap<u64, Entry>,
}

impl RegistryState {
    // Ids are handed out in order, so an id below `next_id` that has no entry
    // was disposed.
    fn was_issued(&self, id: u64) -> bool {
        id >= 1 && id < self.next_id
    }
}

/// Table of the live handles handed to the host.
///
/// Disposing removes the entry. A repeated dispose is a no-op and any other use
/// reports `UseAfterDispose` instead of `InvalidHandle`.
pub struct HandleRegistry {
    registry_id: u32,
    state: Mutex<RegistryState>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            registry_id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(RegistryState {
                next_id: 1,
                entries: HashMap::new(),
            }),
        }
    }

    #[instrument(name = "registry::register", level = "trace", skip(self, object), fields(kind = ?object.kind()))]
    pub fn register(&self, object: NativeObject) -> Handle {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;

        let handle = Handle::new(self.registry_id, id, object.kind());
        let token = Arc::new(LiveToken::new(id));
        state.entries.insert(id, Entry { object, token });
        trace!(%handle, "registered");
        handle
    }

    /// The live object behind `handle` together with its liveness token.
    pub fn lookup(&self, handle: Handle) -> Result<(NativeObject, Arc<LiveToken>)> {
        let state = self.state.lock();
        match self.entry(&state, handle)? {
            Some(entry) => Ok((entry.object.clone(), Arc::clone(&entry.token))),
            None => Err(BridgeError::UseAfterDispose { id: handle.id() }),
        }
    }

    pub fn tensor(&self, handle: Handle) -> Result<(Tensor, Arc<LiveToken>)> {
        match self.lookup(handle)? {
            (NativeObject::Tensor(tensor), token) => Ok((tensor, token)),
            (other, _) => Err(BridgeError::type_error(
                "tensor handle",
                format!("{:?} handle", other.kind()),
            )),
        }
    }

    pub fn wrapped(&self, handle: Handle) -> Result<Arc<WrappedStruct>> {
        match self.lookup(handle)? {
            (NativeObject::Wrapped(wrapped), _) => Ok(wrapped),
            (other, _) => Err(BridgeError::type_error(
                "wrapped struct handle",
                format!("{:?} handle", other.kind()),
            )),
        }
    }

    /// One named field of the object behind `handle`.
    ///
    /// Wrapped structs expose their record fields. Tensors expose `dtype`,
    /// `elements`, `bytes`, `ndim` and `contiguous`.
    pub fn accessor(&self, handle: Handle, field: &str) -> Result<HostValue> {
        let (object, _) = self.lookup(handle)?;
        let value = match &object {
            NativeObject::Wrapped(wrapped) => wrapped.field(field),
            NativeObject::Tensor(tensor) => match field {
                "dtype" => Some(i64::from(tensor.dtype().tag()).to_host()),
                "elements" => Some((tensor.num_elements() as u64).to_host()),
                "bytes" => Some((tensor.size_in_bytes() as u64).to_host()),
                "ndim" => Some((tensor.desc().ndim() as u32).to_host()),
                "contiguous" => Some(tensor.is_contiguous().to_host()),
                _ => None,
            },
        };

        value.ok_or_else(|| BridgeError::MissingField {
            field: field.to_string(),
        })
    }

    /// Release the object behind `handle`. Returns whether this call released it;
    /// disposing an already disposed handle is a no-op.
    #[instrument(name = "registry::dispose", level = "debug", skip(self, handle), fields(handle = %handle))]
    pub fn dispose(&self, handle: Handle) -> Result<bool> {
        self.check_registry(handle)?;
        let released = {
            let mut state = self.state.lock();
            match state.entries.remove(&handle.id()) {
                Some(entry) => Some((entry.object, entry.token)),
                None if state.was_issued(handle.id()) => None,
                None => return Err(BridgeError::InvalidHandle { id: handle.id() }),
            }
        };

        // Native memory is freed here, outside the table lock.
        match released {
            Some((object, token)) => {
                drop(token);
                drop(object);
                debug!("disposed");
                Ok(true)
            }
            None => {
                trace!("already disposed");
                Ok(false)
            }
        }
    }

    /// Finalizer path: never fails. Returns whether a live handle was reclaimed.
    pub fn finalize(&self, handle: Handle) -> bool {
        match self.dispose(handle) {
            Ok(true) => {
                warn!(%handle, "handle reclaimed by finalizer without an explicit dispose");
                true
            }
            Ok(false) => false,
            Err(err) => {
                debug!(%handle, %err, "finalizer ignored handle");
                false
            }
        }
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        let state = self.state.lock();
        matches!(self.entry(&state, handle), Ok(Some(_)))
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn live_handles(&self) -> Vec<Handle> {
        let state = self.state.lock();
        let mut handles: Vec<Handle> = state
            .entries
            .iter()
            .map(|(id, entry)| Handle::new(self.registry_id, *id, entry.object.kind()))
            .collect();
        handles.sort_by_key(Handle::id);
        handles
    }

    fn check_registry(&self, handle: Handle) -> Result<()> {
        if handle.registry() != self.registry_id {
            return Err(BridgeError::InvalidHandle { id: handle.id() });
        }
        Ok(())
    }

    /// `Some` for a live handle, `None` for a disposed one.
    fn entry<'a>(&self, state: &'a RegistryState, handle: Handle) -> Result<Option<&'a Entry>> {
        self.check_registry(handle)?;
        match state.entries.get(&handle.id()) {
            Some(entry) => Ok(Some(entry)),
            None if state.was_issued(handle.id()) => Ok(None),
            None => Err(BridgeError::InvalidHandle { id: handle.id() }),
        }
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
