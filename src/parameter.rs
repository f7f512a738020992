use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ndarray::ArrayD;
use parking_lot::{RwLock, RwLockWriteGuard};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// The stable identity of a parameter, usable as a map or set key.
///
/// Identities are process-unique and never reused. They are the canonical key
/// for both the state store and the grad skip set; parameters are never
/// compared by value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ParamId(u64);

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param#{}", self.0)
    }
}

/// A shared handle to a trainable tensor.
///
/// Cloning clones the handle, not the storage: every clone observes the same
/// value, gradient and `requires_grad` flag, and reports the same id. The
/// surrounding model owns the parameters; the optimizer only reads and writes
/// their contents.
#[derive(Clone, Debug)]
pub struct Parameter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: ParamId,
    data: RwLock<ParamData>,
}

#[derive(Debug)]
pub(crate) struct ParamData {
    pub(crate) value: ArrayD<f32>,
    pub(crate) grad: Option<ArrayD<f32>>,
    pub(crate) requires_grad: bool,
}

impl Parameter {
    /// Creates a new trainable parameter holding `value`.
    pub fn new(value: ArrayD<f32>) -> Self {
        Self::with_requires_grad(value, true)
    }

    /// Creates a parameter that is excluded from training.
    pub fn frozen(value: ArrayD<f32>) -> Self {
        Self::with_requires_grad(value, false)
    }

    /// Creates a trainable zero-dimensional parameter.
    pub fn scalar(value: f32) -> Self {
        Self::new(ndarray::arr0(value).into_dyn())
    }

    fn with_requires_grad(value: ArrayD<f32>, requires_grad: bool) -> Self {
        let inner = Inner {
            id: ParamId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            data: RwLock::new(ParamData {
                value,
                grad: None,
                requires_grad,
            }),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn id(&self) -> ParamId {
        self.inner.id
    }

    pub fn requires_grad(&self) -> bool {
        self.inner.data.read().requires_grad
    }

    pub fn set_requires_grad(&self, requires_grad: bool) {
        self.inner.data.write().requires_grad = requires_grad;
    }

    /// Returns a snapshot of the current value.
    pub fn value(&self) -> ArrayD<f32> {
        self.inner.data.read().value.clone()
    }

    /// Returns the single element of a scalar (or one-element) parameter.
    ///
    /// # Panics
    /// If the parameter holds more than one element.
    pub fn item(&self) -> f32 {
        let data = self.inner.data.read();
        assert_eq!(data.value.len(), 1, "item() requires a one-element value");
        data.value.iter().copied().next().unwrap()
    }

    /// Returns a snapshot of the current gradient, if one is set.
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.inner.data.read().grad.clone()
    }

    /// Installs a gradient, replacing any previous one.
    ///
    /// This stands in for the external differentiation pass that normally
    /// populates gradients during backward.
    pub fn set_grad(&self, grad: ArrayD<f32>) {
        let mut data = self.inner.data.write();
        debug_assert_eq!(grad.shape(), data.value.shape());
        data.grad = Some(grad);
    }

    /// Removes the gradient, marking it absent.
    pub fn clear_grad(&self) {
        self.inner.data.write().grad = None;
    }

    pub(crate) fn raw_dim(&self) -> ndarray::IxDyn {
        self.inner.data.read().value.raw_dim()
    }

    pub(crate) fn lock(&self) -> RwLockWriteGuard<'_, ParamData> {
        self.inner.data.write()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use super::*;

    #[test]
    fn ids_are_unique_and_stable_across_clones() {
        let a = Parameter::scalar(1.0);
        let b = Parameter::scalar(1.0);
        assert_ne!(a.id(), b.id());

        let a2 = a.clone();
        assert_eq!(a.id(), a2.id());
    }

    #[test]
    fn clones_alias_the_same_storage() {
        let a = Parameter::new(arr1(&[1.0, 2.0]).into_dyn());
        let b = a.clone();

        b.set_grad(arr1(&[0.5, 0.5]).into_dyn());
        assert_eq!(a.grad().unwrap(), arr1(&[0.5, 0.5]).into_dyn());

        a.clear_grad();
        assert!(b.grad().is_none());
    }

    #[test]
    fn frozen_parameters_report_requires_grad_false() {
        let p = Parameter::frozen(arr1(&[1.0]).into_dyn());
        assert!(!p.requires_grad());

        p.set_requires_grad(true);
        assert!(p.requires_grad());
    }

    #[test]
    fn item_reads_scalar_values() {
        let p = Parameter::scalar(1.23);
        assert_eq!(p.item(), 1.23);
    }
}
