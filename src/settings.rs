//! Settings of an adapter instance.

use crate::constants::{max_step, tolerance};
use crate::ode_shared::FloatNumber;
use crate::tolerance::Tolerance;

/// Tolerances, bounds and step heuristic settings handed to
/// [`OdeSys::new`](crate::OdeSys::new).
///
/// Values are validated once, when the adapter is constructed.
#[derive(Clone, Debug)]
pub struct Settings<T> {
    /// Relative tolerance. Default is 1e-8.
    pub rtol: T,
    /// Absolute tolerance, one broadcast value or one per component. Default is 1e-8.
    pub atol: Tolerance<T>,
    /// Extra model parameters. Default is empty.
    pub extra_parameters: Vec<T>,
    /// Lower bounds of the state. `None` leaves every component unbounded below.
    pub lower_bounds: Option<Vec<T>>,
    /// Upper bounds of the state. `None` leaves every component unbounded above.
    pub upper_bounds: Option<Vec<T>>,
    /// Fixed first step. `None` uses the heuristic of `get_dx0`.
    pub first_step: Option<T>,
    /// Fraction in (0, 1] of the bound-limited Euler step returned by
    /// `get_dx_max`. Default is 1.0.
    pub dx_max_factor: T,
    /// Report non-finite model output as a domain error. Default is true.
    pub check_finite: bool,
}

impl<T: FloatNumber> Default for Settings<T> {
    fn default() -> Self {
        Self {
            rtol: tolerance::default_rtol(),
            atol: Tolerance::Scalar(tolerance::default_atol()),
            extra_parameters: Vec::new(),
            lower_bounds: None,
            upper_bounds: None,
            first_step: None,
            dx_max_factor: max_step::default_factor(),
            check_finite: true,
        }
    }
}

impl<T: FloatNumber> Settings<T> {
    /// Settings with the given tolerances and defaults for everything else.
    pub fn new(rtol: T, atol: impl Into<Tolerance<T>>) -> Self {
        Self {
            rtol,
            atol: atol.into(),
            ..Self::default()
        }
    }

    pub fn extra_parameters(mut self, extra: Vec<T>) -> Self {
        self.extra_parameters = extra;
        self
    }

    pub fn bounds(self, lower: Vec<T>, upper: Vec<T>) -> Self {
        self.lower_bounds(lower).upper_bounds(upper)
    }

    pub fn lower_bounds(mut self, lower: Vec<T>) -> Self {
        self.lower_bounds = Some(lower);
        self
    }

    pub fn upper_bounds(mut self, upper: Vec<T>) -> Self {
        self.upper_bounds = Some(upper);
        self
    }

    pub fn first_step(mut self, h: T) -> Self {
        self.first_step = Some(h);
        self
    }

    pub fn dx_max_factor(mut self, factor: T) -> Self {
        self.dx_max_factor = factor;
        self
    }

    pub fn check_finite(mut self, check: bool) -> Self {
        self.check_finite = check;
        self
    }
}
