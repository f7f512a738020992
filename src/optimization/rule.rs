use crate::error::Result;
use crate::group::ParamGroup;
use crate::skip::GradSkipSet;
use crate::state::StateStore;

/// Defines the strategy for stepping a parameter group's weights from state
/// `t` to `t+1`.
pub trait UpdateRule {
    /// Allocates whatever per-parameter state the rule needs for `group`.
    ///
    /// Called before every update pass; must be idempotent.
    fn create_state(&self, group: &ParamGroup, state: &mut StateStore);

    /// Applies one in-place update to every parameter in `group`, in group
    /// order. Parameters found in `skip` are consumed from it and left
    /// untouched.
    ///
    /// # Errors
    /// Returns `MissingGradient` when a trainable, non-skipped parameter has
    /// no gradient.
    fn apply_updates(
        &self,
        group: &ParamGroup,
        state: &mut StateStore,
        skip: &mut GradSkipSet,
    ) -> Result<()>;
}
