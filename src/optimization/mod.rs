mod rule;
mod sgd;

pub use rule::UpdateRule;
pub use sgd::Sgd;
