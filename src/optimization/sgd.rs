use super::UpdateRule;
use crate::error::{OptimErr, Result};
use crate::group::ParamGroup;
use crate::skip::GradSkipSet;
use crate::state::{MOMENTUM_BUFFER, StateStore};

/// Stochastic gradient descent with momentum and L2 weight decay.
///
/// Update rule, in this fixed order (reordering changes training numerics):
/// ```text
/// g = grad + weight_decay * value
/// v = momentum * v_prev + g
/// value -= lr * v
/// ```
/// With zero momentum the step is `value -= lr * g` and no state is touched.
#[derive(Debug, Default)]
pub struct Sgd;

impl UpdateRule for Sgd {
    fn create_state(&self, group: &ParamGroup, state: &mut StateStore) {
        if group.hyper().momentum != 0.0 {
            for param in group.params() {
                state.ensure(param, MOMENTUM_BUFFER);
            }
        }
    }

    fn apply_updates(
        &self,
        group: &ParamGroup,
        state: &mut StateStore,
        skip: &mut GradSkipSet,
    ) -> Result<()> {
        let hyper = group.hyper();

        for param in group.params() {
            // Routine control flow: the parameter was already updated by
            // another code path or is not owned locally.
            if skip.take(param.id()) {
                continue;
            }

            // The buffer handle is grabbed before locking the parameter so
            // `ensure` never nests inside the parameter lock.
            let buf = (hyper.momentum != 0.0).then(|| state.ensure(param, MOMENTUM_BUFFER));

            let mut data = param.lock();
            if !data.requires_grad {
                continue;
            }

            let Some(grad) = data.grad.as_ref() else {
                return Err(OptimErr::MissingGradient { param: param.id() });
            };

            let mut g = grad.clone();
            if hyper.weight_decay != 0.0 {
                g.scaled_add(hyper.weight_decay, &data.value);
            }

            match buf {
                Some(buf) => {
                    let mut v = buf.snapshot();
                    v *= hyper.momentum;
                    v += &g;
                    data.value.scaled_add(-hyper.lr, &v);
                    buf.replace(&v);
                }
                None => data.value.scaled_add(-hyper.lr, &g),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, arr1};

    use crate::group::Hyper;

    use super::*;
    use crate::parameter::Parameter;

    fn apply(group: &ParamGroup, state: &mut StateStore, skip: &mut GradSkipSet) -> Result<()> {
        let rule = Sgd;
        rule.create_state(group, state);
        rule.apply_updates(group, state, skip)
    }

    fn close(a: &ArrayD<f32>, b: &ArrayD<f32>) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn vanilla_step_is_exact() {
        let p = Parameter::new(arr1(&[1.0, 2.0, 3.0]).into_dyn());
        p.set_grad(arr1(&[0.1, 0.2, 0.3]).into_dyn());

        let group = ParamGroup::new(vec![p.clone()], Hyper::new(0.1)).unwrap();
        apply(&group, &mut StateStore::new(), &mut GradSkipSet::new()).unwrap();

        // value - lr * grad
        assert!(close(&p.value(), &arr1(&[0.99, 1.98, 2.97]).into_dyn()));
    }

    #[test]
    fn zero_momentum_touches_no_state() {
        let p = Parameter::scalar(1.0);
        p.set_grad(ndarray::arr0(1.0).into_dyn());

        let group = ParamGroup::new(vec![p], Hyper::new(0.1)).unwrap();
        let mut state = StateStore::new();
        apply(&group, &mut state, &mut GradSkipSet::new()).unwrap();

        assert!(state.is_empty());
    }

    #[test]
    fn weight_decay_folds_into_the_gradient() {
        let p = Parameter::scalar(2.0);
        p.set_grad(ndarray::arr0(1.0).into_dyn());

        let hyper = Hyper::new(0.1).weight_decay(0.5);
        let group = ParamGroup::new(vec![p.clone()], hyper).unwrap();
        apply(&group, &mut StateStore::new(), &mut GradSkipSet::new()).unwrap();

        // g = 1 + 0.5 * 2 = 2, value = 2 - 0.1 * 2
        assert!((p.item() - 1.8).abs() < 1e-6);
    }

    #[test]
    fn momentum_buffer_evolves_from_zero() {
        let p = Parameter::scalar(1.23);
        let hyper = Hyper::new(1.0).momentum(0.9);
        let group = ParamGroup::new(vec![p.clone()], hyper).unwrap();

        let mut state = StateStore::new();
        let mut skip = GradSkipSet::new();

        p.set_grad(ndarray::arr0(2.34).into_dyn());
        apply(&group, &mut state, &mut skip).unwrap();

        let buf = state.get(p.id(), MOMENTUM_BUFFER).unwrap();
        assert!(close(&buf.snapshot(), &ndarray::arr0(2.34).into_dyn()));
        assert!((p.item() - (1.23 - 2.34)).abs() < 1e-5);

        p.set_grad(ndarray::arr0(2.34).into_dyn());
        apply(&group, &mut state, &mut skip).unwrap();

        // v = 0.9 * 2.34 + 2.34
        assert!(close(&buf.snapshot(), &ndarray::arr0(4.446).into_dyn()));
        assert!((p.item() - (-1.11 - 4.446)).abs() < 1e-4);
    }

    #[test]
    fn frozen_parameters_are_left_untouched() {
        let p = Parameter::frozen(arr1(&[1.0, 2.0]).into_dyn());
        let group = ParamGroup::new(vec![p.clone()], Hyper::new(0.1)).unwrap();

        // No gradient set: a frozen parameter must not even be inspected for one.
        apply(&group, &mut StateStore::new(), &mut GradSkipSet::new()).unwrap();

        assert_eq!(p.value(), arr1(&[1.0, 2.0]).into_dyn());
    }

    #[test]
    fn skipped_parameters_are_consumed_and_left_untouched() {
        let p = Parameter::scalar(5.0);
        let group = ParamGroup::new(vec![p.clone()], Hyper::new(0.1)).unwrap();

        let mut skip = GradSkipSet::new();
        skip.insert(p.id());

        apply(&group, &mut StateStore::new(), &mut skip).unwrap();

        assert_eq!(p.item(), 5.0);
        assert!(skip.is_empty());
    }

    #[test]
    fn missing_gradient_fails_the_pass() {
        let p = Parameter::scalar(1.0);
        let group = ParamGroup::new(vec![p.clone()], Hyper::new(0.1)).unwrap();

        let err = apply(&group, &mut StateStore::new(), &mut GradSkipSet::new()).unwrap_err();
        assert!(matches!(err, OptimErr::MissingGradient { param } if param == p.id()));
    }
}
