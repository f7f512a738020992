use std::{error::Error, fmt};

use crate::parameter::ParamId;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, OptimErr>;

/// Optimization state engine failures.
///
/// Every variant signals a programming or integration defect, not a transient
/// condition. None of them are retried at this layer.
#[derive(Debug)]
pub enum OptimErr {
    /// A hyperparameter was negative or non-finite at construction.
    InvalidHyper {
        name: &'static str,
        value: f32,
    },
    /// A trainable, non-skipped parameter had no gradient at update time.
    MissingGradient {
        param: ParamId,
    },
    /// The grad skip set still held entries after every group was visited.
    SkipSetNotDrained {
        remaining: usize,
    },
}

impl fmt::Display for OptimErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimErr::InvalidHyper { name, value } => {
                write!(f, "invalid {name}: {value}, must be finite and non-negative")
            }
            OptimErr::MissingGradient { param } => write!(
                f,
                "gradient not available for {param}, step attempted before a backward pass computed it"
            ),
            OptimErr::SkipSetNotDrained { remaining } => write!(
                f,
                "grad skip set still holds {remaining} entries after a full update pass"
            ),
        }
    }
}

impl Error for OptimErr {}
