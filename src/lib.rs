pub mod error;
pub mod group;
pub mod optimization;
pub mod optimizer;
pub mod parameter;
pub mod skip;
pub mod state;

pub use error::{OptimErr, Result};
pub use group::{GroupSpec, Hyper, ParamGroup};
pub use optimization::{Sgd, UpdateRule};
pub use optimizer::Optimizer;
pub use parameter::{ParamId, Parameter};
pub use skip::GradSkipSet;
pub use state::{MOMENTUM_BUFFER, StateBuffer, StateStore};
