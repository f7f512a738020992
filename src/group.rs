use crate::error::{OptimErr, Result};
use crate::parameter::Parameter;

/// The hyperparameters shared by every parameter in a group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hyper {
    /// The small coefficient that modulates the amount of training per update.
    pub lr: f32,
    /// Momentum factor blending past effective gradients into the update.
    pub momentum: f32,
    /// L2 penalty folded into the gradient before momentum.
    pub weight_decay: f32,
}

impl Hyper {
    /// Creates hyperparameters with the given learning rate, no momentum and
    /// no weight decay.
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            momentum: 0.0,
            weight_decay: 0.0,
        }
    }

    pub fn momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let fields = [
            ("lr", self.lr),
            ("momentum", self.momentum),
            ("weight_decay", self.weight_decay),
        ];

        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(OptimErr::InvalidHyper { name, value });
            }
        }

        Ok(())
    }
}

/// Describes one parameter group for optimizer construction.
///
/// Unset fields fall back to the optimizer-wide defaults. Hyperparameters are
/// typed fields, so there is no open-ended key mapping to validate.
#[derive(Clone, Debug)]
pub struct GroupSpec {
    pub params: Vec<Parameter>,
    pub lr: Option<f32>,
    pub momentum: Option<f32>,
    pub weight_decay: Option<f32>,
}

impl GroupSpec {
    pub fn new(params: Vec<Parameter>) -> Self {
        Self {
            params,
            lr: None,
            momentum: None,
            weight_decay: None,
        }
    }

    pub fn lr(mut self, lr: f32) -> Self {
        self.lr = Some(lr);
        self
    }

    pub fn momentum(mut self, momentum: f32) -> Self {
        self.momentum = Some(momentum);
        self
    }

    pub fn weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = Some(weight_decay);
        self
    }

    pub(crate) fn resolve(&self, defaults: Hyper) -> Hyper {
        Hyper {
            lr: self.lr.unwrap_or(defaults.lr),
            momentum: self.momentum.unwrap_or(defaults.momentum),
            weight_decay: self.weight_decay.unwrap_or(defaults.weight_decay),
        }
    }
}

/// An ordered collection of parameters sharing one hyperparameter record.
///
/// Membership is fixed at creation; new groups enter the optimizer only
/// through its explicit group-management interface.
#[derive(Debug)]
pub struct ParamGroup {
    params: Vec<Parameter>,
    hyper: Hyper,
}

impl ParamGroup {
    /// Creates a group after validating its hyperparameters.
    ///
    /// # Errors
    /// Returns `InvalidHyper` for a negative or non-finite field.
    pub(crate) fn new(params: Vec<Parameter>, hyper: Hyper) -> Result<Self> {
        hyper.validate()?;
        Ok(Self { params, hyper })
    }

    /// The group's parameters, in registration order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn hyper(&self) -> Hyper {
        self.hyper
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_hyperparameters_are_rejected() {
        for hyper in [
            Hyper::new(-0.1),
            Hyper::new(0.1).momentum(-0.9),
            Hyper::new(0.1).weight_decay(-1e-4),
        ] {
            assert!(matches!(
                hyper.validate(),
                Err(OptimErr::InvalidHyper { .. })
            ));
        }
    }

    #[test]
    fn non_finite_hyperparameters_are_rejected() {
        assert!(matches!(
            Hyper::new(f32::NAN).validate(),
            Err(OptimErr::InvalidHyper { name: "lr", .. })
        ));
        assert!(matches!(
            Hyper::new(f32::INFINITY).validate(),
            Err(OptimErr::InvalidHyper { name: "lr", .. })
        ));
    }

    #[test]
    fn zero_is_a_valid_hyperparameter_value() {
        assert!(Hyper::new(0.0).validate().is_ok());
    }

    #[test]
    fn spec_overrides_beat_defaults() {
        let defaults = Hyper::new(0.1).momentum(0.9).weight_decay(1e-4);
        let spec = GroupSpec::new(vec![]).lr(0.01).momentum(0.0);

        let resolved = spec.resolve(defaults);
        assert_eq!(resolved.lr, 0.01);
        assert_eq!(resolved.momentum, 0.0);
        assert_eq!(resolved.weight_decay, 1e-4);
    }
}
