use std::collections::HashSet;

use crate::parameter::ParamId;

/// Parameter identities excluded from the current update pass.
///
/// Populated by the distributed layer before `step()` for parameters that are
/// frozen or already updated by another code path, and drained entry by entry
/// as the update rule visits them. A non-empty set after every group was
/// processed signals a bookkeeping mismatch between the distributed layer and
/// the optimizer's parameter groups.
#[derive(Debug, Default)]
pub struct GradSkipSet {
    ids: HashSet<ParamId>,
}

impl GradSkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a parameter to be skipped by the next update pass.
    ///
    /// # Returns
    /// `false` if the parameter was already marked.
    pub fn insert(&mut self, id: ParamId) -> bool {
        self.ids.insert(id)
    }

    /// Removes `id` from the set, reporting whether it was present.
    ///
    /// Update rules call this once per visited parameter; a `true` return
    /// means the parameter must be left untouched this pass.
    pub fn take(&mut self, id: ParamId) -> bool {
        self.ids.remove(&id)
    }

    pub fn contains(&self, id: ParamId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ParamId> + '_ {
        self.ids.iter().copied()
    }
}
