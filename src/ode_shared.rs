//! Shared traits and structures for the model adapter and its drivers.

use std::fmt;
use thiserror::Error;

use simba::scalar::RealField;

use crate::constants::sentinel;

/// Scalar type the adapter computes with. Implemented for `f64` and `f32`.
pub trait FloatNumber: RealField + Copy {}

impl<T: RealField + Copy> FloatNumber for T {}

/// Outcome of a single evaluation callback.
pub type EvalResult<R = ()> = Result<R, EvalError>;

/// Capability set an integrator driver consumes.
///
/// Every buffer is owned by the caller. Implementations write into the
/// provided slices and never keep references to them once the call returns.
/// The contents of an output buffer are only meaningful when the call
/// returned `Ok`.
pub trait OdeSystem<T: FloatNumber> {
    /// Number of state variables.
    fn get_ny(&self) -> usize;

    /// Number of root (event) functions.
    fn get_nroots(&self) -> usize {
        0
    }

    /// Right-hand side `f = dy/dt` evaluated at `(t, y)`.
    fn rhs(&self, t: T, y: &[T], f: &mut [T]) -> EvalResult;

    /// Dense Jacobian `df/dy` in column-major layout, `ldim` being the stride
    /// between columns. Writes `df/dt` into `dfdt` when it is given.
    fn dense_jac_cmaj(
        &self,
        t: T,
        y: &[T],
        fy: Option<&[T]>,
        jac: &mut [T],
        ldim: usize,
        dfdt: Option<&mut [T]>,
    ) -> EvalResult;

    /// Dense Jacobian `df/dy` in row-major layout, `ldim` being the stride
    /// between rows. Writes `df/dt` into `dfdt` when it is given.
    fn dense_jac_rmaj(
        &self,
        t: T,
        y: &[T],
        fy: Option<&[T]>,
        jac: &mut [T],
        ldim: usize,
        dfdt: Option<&mut [T]>,
    ) -> EvalResult;

    /// Event function values, one per root function.
    fn roots(&self, _t: T, _y: &[T], _out: &mut [T]) -> EvalResult {
        Ok(())
    }

    /// Suggested size of the first step. `None` lets the driver use its own
    /// default.
    fn get_dx0(&self, _t: T, _y: &[T]) -> Option<T> {
        None
    }

    /// Largest step the driver should attempt from `(t, y)`. Positive
    /// infinity means no limit.
    fn get_dx_max(&self, _t: T, _y: &[T]) -> T {
        sentinel::no_limit()
    }
}

/// Additional callbacks needed by drivers solving the Newton systems with an
/// iterative (Krylov) linear solver.
pub trait IterativeOdeSystem<T: FloatNumber>: OdeSystem<T> {
    /// Jacobian-vector product `out = J(t, y) * vec`.
    fn jac_times_vec(
        &self,
        vec: &[T],
        out: &mut [T],
        t: T,
        y: &[T],
        fy: Option<&[T]>,
    ) -> EvalResult;

    /// Prepares the preconditioner `I - gamma * J`. When `jok` is true the
    /// previously evaluated Jacobian may be reused. Returns whether the
    /// Jacobian was recomputed.
    fn prec_setup(
        &mut self,
        t: T,
        y: &[T],
        fy: Option<&[T]>,
        jok: bool,
        gamma: T,
    ) -> EvalResult<bool>;

    /// Solves `(I - gamma * J) z = r` with the factors from the last
    /// [`prec_setup`](IterativeOdeSystem::prec_setup).
    fn prec_solve_left(&self, r: &[T], z: &mut [T]) -> EvalResult;
}

/// Enumeration of the errors that may arise while evaluating the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Expression `{expr}` is undefined at the given state.")]
    Domain { expr: &'static str },
    #[error("Non-finite value written to `{buffer}` at index {index}.")]
    NonFinite { buffer: &'static str, index: usize },
    #[error("State component {index} lies outside its bounds.")]
    OutOfBounds { index: usize },
    #[error("Buffer `{buffer}` has length {got}, expected at least {expected}.")]
    DimensionMismatch {
        buffer: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("The iteration matrix I - gamma*J is singular.")]
    SingularMatrix,
    #[error("The preconditioner has not been set up.")]
    PreconditionerNotSetUp,
}

impl EvalError {
    /// Whether the driver may recover by rejecting the trial state (e.g.
    /// shrinking the step) instead of aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EvalError::Domain { .. }
                | EvalError::NonFinite { .. }
                | EvalError::OutOfBounds { .. }
                | EvalError::SingularMatrix
        )
    }
}

/// Enumeration of the errors that prevent an adapter from being constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Model expects {expected} parameters, got {got}.")]
    ParameterCount { expected: usize, got: usize },
    #[error("Expected 1 or {expected} absolute tolerances, got {got}.")]
    ToleranceLength { expected: usize, got: usize },
    #[error("Tolerance `{name}` must be finite and non-negative.")]
    InvalidTolerance { name: &'static str },
    #[error("Expected {expected} {which} bounds, got {got}.")]
    BoundsLength {
        which: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Bound of component {index} is NaN.")]
    InvalidBound { index: usize },
    #[error("Lower bound exceeds upper bound for component {index}.")]
    InvertedBounds { index: usize },
    #[error("Factor `{name}` must lie in (0, 1].")]
    InvalidFactor { name: &'static str },
    #[error("First step must be finite and strictly positive.")]
    InvalidFirstStep,
}

/// Checks that a caller buffer holds at least `expected` elements.
pub(crate) fn check_len(buffer: &'static str, len: usize, expected: usize) -> EvalResult {
    if len < expected {
        return Err(EvalError::DimensionMismatch {
            buffer,
            expected,
            got: len,
        });
    }
    Ok(())
}

/// Contains some statistics of the evaluations requested by the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub nfev: usize,
    pub njev: usize,
    pub nrev: usize,
    pub njvev: usize,
    pub nprec_setup: usize,
    pub nprec_solve: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of right-hand side evaluations: {}", self.nfev)?;
        writeln!(f, "Number of Jacobian evaluations: {}", self.njev)?;
        writeln!(f, "Number of root function evaluations: {}", self.nrev)?;
        writeln!(f, "Number of Jacobian-vector products: {}", self.njvev)?;
        writeln!(f, "Number of preconditioner setups: {}", self.nprec_setup)?;
        write!(f, "Number of preconditioner solves: {}", self.nprec_solve)
    }
}
