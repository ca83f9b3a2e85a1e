//! Trait implemented by each generated equation set.

use crate::jacobian::{forward_difference, JacobianView};
use crate::ode_shared::{EvalResult, FloatNumber};
use crate::parameters::Parameters;

/// Equations of one ODE model.
///
/// The dimensions are fixed per model. [`OdeSys`](crate::OdeSys) checks every
/// buffer against them before calling into the model, so implementations may
/// index `y`, `f` and `out` directly.
///
/// An expression that is undefined at the requested state must be reported
/// with [`EvalError::Domain`](crate::EvalError::Domain) rather than a panic.
pub trait Model<T: FloatNumber> {
    /// Number of state variables.
    const NY: usize;
    /// Number of primary parameters.
    const NPARAMS: usize;
    /// Number of root functions.
    const NROOTS: usize = 0;

    /// Common subexpressions of the parameters, computed once at
    /// construction.
    fn derive_parameters(&self, _params: &[T], _extra: &[T]) -> Vec<T> {
        Vec::new()
    }

    /// Right-hand side `f = dy/dt`.
    fn rhs(&self, t: T, y: &[T], p: &Parameters<T>, f: &mut [T]) -> EvalResult;

    /// Jacobian `df/dy`, plus `df/dt` when `dfdt` is given.
    ///
    /// `jac` is zero-filled on entry, so only structurally non-zero entries
    /// need to be written. The default approximates it by forward differences
    /// of [`rhs`](Model::rhs).
    fn jac(
        &self,
        t: T,
        y: &[T],
        fy: Option<&[T]>,
        p: &Parameters<T>,
        jac: &mut JacobianView<'_, T>,
        dfdt: Option<&mut [T]>,
    ) -> EvalResult {
        forward_difference(|t, y, f| self.rhs(t, y, p, f), t, y, fy, jac, dfdt)
    }

    /// Event function values.
    fn roots(&self, _t: T, _y: &[T], _p: &Parameters<T>, _out: &mut [T]) -> EvalResult {
        Ok(())
    }
}
