use log::debug;

use crate::error::{OptimErr, Result};
use crate::group::{GroupSpec, Hyper, ParamGroup};
use crate::optimization::{Sgd, UpdateRule};
use crate::parameter::Parameter;
use crate::skip::GradSkipSet;
use crate::state::StateStore;

/// The optimizer lifecycle shell.
///
/// Owns the parameter groups, the state store and the shared grad skip set,
/// and delegates state creation and update work to its [`UpdateRule`].
///
/// One step cycle: `zero_grad()`, an external forward/backward pass installs
/// gradients on the parameters, then `step()`. Calling `step()` before
/// gradients are ready fails with `MissingGradient`.
#[derive(Debug)]
pub struct Optimizer<R: UpdateRule> {
    rule: R,
    defaults: Hyper,
    groups: Vec<ParamGroup>,
    state: StateStore,
    skip: GradSkipSet,
}

impl<R: UpdateRule> Optimizer<R> {
    /// Creates an optimizer over a flat parameter list, folded into one
    /// implicit group using `defaults`.
    ///
    /// # Errors
    /// Returns `InvalidHyper` before any state is created if a default is
    /// negative or non-finite.
    pub fn new(rule: R, defaults: Hyper, params: Vec<Parameter>) -> Result<Self> {
        Self::with_groups(rule, defaults, vec![GroupSpec::new(params)])
    }

    /// Creates an optimizer over explicit group specifications, each
    /// optionally overriding the defaults.
    ///
    /// # Errors
    /// Returns `InvalidHyper` before any state is created if any resolved
    /// group hyperparameter is negative or non-finite.
    pub fn with_groups(rule: R, defaults: Hyper, specs: Vec<GroupSpec>) -> Result<Self> {
        defaults.validate()?;

        let mut optimizer = Self {
            rule,
            defaults,
            groups: Vec::with_capacity(specs.len()),
            state: StateStore::new(),
            skip: GradSkipSet::new(),
        };

        for spec in specs {
            optimizer.add_group(spec)?;
        }

        Ok(optimizer)
    }

    /// The explicit group-management entry point: registers a new parameter
    /// group behind the existing ones.
    ///
    /// # Errors
    /// Returns `InvalidHyper` if a resolved hyperparameter is invalid.
    pub fn add_group(&mut self, spec: GroupSpec) -> Result<()> {
        let hyper = spec.resolve(self.defaults);
        let group = ParamGroup::new(spec.params, hyper)?;
        self.groups.push(group);
        Ok(())
    }

    /// Clears the gradients of every registered parameter.
    pub fn zero_grad(&mut self) {
        for group in &self.groups {
            for param in group.params() {
                param.clear_grad();
            }
        }
    }

    /// Runs one update pass: for each group in registration order, ensures
    /// the group's state exists and applies the update rule, then checks that
    /// the skip set was fully drained.
    ///
    /// The drained-set check runs once after all groups, since skip entries
    /// may reference parameters in any group.
    ///
    /// # Errors
    /// `MissingGradient` if a trainable, non-skipped parameter has no
    /// gradient; `SkipSetNotDrained` if skip entries matched no visited
    /// parameter.
    pub fn step(&mut self) -> Result<()> {
        for group in &self.groups {
            self.rule.create_state(group, &mut self.state);
            self.rule.apply_updates(group, &mut self.state, &mut self.skip)?;
        }

        if !self.skip.is_empty() {
            return Err(OptimErr::SkipSetNotDrained {
                remaining: self.skip.len(),
            });
        }

        debug!("stepped {} parameter groups", self.groups.len());
        Ok(())
    }

    pub fn groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    /// Read access to the optimizer-owned state, for checkpointing.
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Write access to the optimizer-owned state, for checkpoint restore.
    pub fn state_mut(&mut self) -> &mut StateStore {
        &mut self.state
    }

    pub fn skip_set(&self) -> &GradSkipSet {
        &self.skip
    }

    /// Write access to the shared skip set. The distributed layer marks
    /// parameters here before each `step()`.
    pub fn skip_set_mut(&mut self) -> &mut GradSkipSet {
        &mut self.skip
    }
}

impl Optimizer<Sgd> {
    /// SGD over a flat parameter list.
    ///
    /// # Errors
    /// Returns `InvalidHyper` for a negative or non-finite hyperparameter.
    pub fn sgd(params: Vec<Parameter>, hyper: Hyper) -> Result<Self> {
        Self::new(Sgd, hyper, params)
    }

    /// SGD over explicit group specifications.
    ///
    /// # Errors
    /// Returns `InvalidHyper` for a negative or non-finite hyperparameter.
    pub fn sgd_with_groups(defaults: Hyper, specs: Vec<GroupSpec>) -> Result<Self> {
        Self::with_groups(Sgd, defaults, specs)
    }
}
