use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Tensor,
    WrappedStruct,
}

/// Opaque reference the host holds for a native-owned object.
///
/// Only a [`HandleRegistry`](super::HandleRegistry) creates handles. The id is
/// never reused, and the registry id makes a handle from another registry
/// detectable rather than silently aliasing one of ours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    registry: u32,
    id: u64,
    kind: HandleKind,
}

impl Handle {
    pub(crate) fn new(registry: u32, id: u64, kind: HandleKind) -> Self {
        Self { registry, id, kind }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub(crate) fn registry(&self) -> u32 {
        self.registry
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.kind, self.id)
    }
}

/// Held by the registry while a handle is live. Aliasing views keep a weak
/// reference and stop working once the registry lets go of it.
#[derive(Debug)]
pub struct LiveToken {
    id: u64,
}

impl LiveToken {
    pub(crate) fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}
