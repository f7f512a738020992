use std::collections::HashMap;
use std::sync::Arc;

use ndarray::ArrayD;
use parking_lot::RwLock;

use crate::parameter::{ParamId, Parameter};

/// Name of the SGD momentum buffer inside the state store.
pub const MOMENTUM_BUFFER: &str = "momentum_buffer";

/// A shared auxiliary buffer owned by the optimizer.
///
/// The cell is shared: a checkpointing or transport layer can hold a clone of
/// the buffer and observe every update without re-fetching, because updates go
/// through [`StateBuffer::replace`] instead of reassignment.
#[derive(Clone, Debug)]
pub struct StateBuffer(Arc<RwLock<ArrayD<f32>>>);

impl StateBuffer {
    fn zeros_like(param: &Parameter) -> Self {
        Self(Arc::new(RwLock::new(ArrayD::zeros(param.raw_dim()))))
    }

    /// Returns a copy of the buffer's contents.
    pub fn snapshot(&self) -> ArrayD<f32> {
        self.0.read().clone()
    }

    /// Overwrites the buffer's contents in place.
    ///
    /// # Panics
    /// If `src` doesn't match the buffer's shape.
    pub fn replace(&self, src: &ArrayD<f32>) {
        self.0.write().assign(src);
    }

    #[cfg(test)]
    fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Lazily allocated per-parameter auxiliary state, keyed by parameter identity
/// and buffer name.
///
/// Entries are created exactly once, on first need, and persist for the
/// parameter's lifetime. A momentum buffer exists for a parameter if and only
/// if it belongs to a group with nonzero momentum.
#[derive(Debug, Default)]
pub struct StateStore {
    entries: HashMap<ParamId, HashMap<&'static str, StateBuffer>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffer for `(param, name)`, allocating a zero-initialized
    /// one shaped like the parameter on first use.
    ///
    /// Idempotent: a second call for the same key returns a handle to the same
    /// underlying storage.
    pub fn ensure(&mut self, param: &Parameter, name: &'static str) -> StateBuffer {
        self.entries
            .entry(param.id())
            .or_default()
            .entry(name)
            .or_insert_with(|| StateBuffer::zeros_like(param))
            .clone()
    }

    /// Returns the buffer for `(param, name)` if it was ever allocated.
    pub fn get(&self, param: ParamId, name: &str) -> Option<StateBuffer> {
        self.entries.get(&param)?.get(name).cloned()
    }

    pub fn contains(&self, param: ParamId, name: &str) -> bool {
        self.get(param, name).is_some()
    }

    /// Iterates over every allocated buffer. Intended for external
    /// checkpointing of the optimizer state.
    pub fn iter(&self) -> impl Iterator<Item = (ParamId, &'static str, StateBuffer)> + '_ {
        self.entries.iter().flat_map(|(&id, named)| {
            named
                .iter()
                .map(move |(&name, buf)| (id, name, buf.clone()))
        })
    }

    /// Total number of allocated buffers.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
