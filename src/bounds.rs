//! Admissible box of the state variables.

use std::cmp::Ordering;

use crate::constants::sentinel;
use crate::ode_shared::{check_len, ConfigError, EvalError, EvalResult, FloatNumber};

/// Component-wise lower and upper bounds of the state.
///
/// An unbounded side is stored as the infinite sentinel (`-inf` for lower
/// bounds, `+inf` for upper bounds).
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds<T> {
    lower: Vec<T>,
    upper: Vec<T>,
}

impl<T: FloatNumber> Bounds<T> {
    /// Bounds that do not constrain any of the `ny` components.
    pub fn unbounded(ny: usize) -> Self {
        Self {
            lower: vec![sentinel::no_lower_bound(); ny],
            upper: vec![sentinel::no_upper_bound(); ny],
        }
    }

    /// Validated bounds for a state of dimension `ny`.
    pub fn new(lower: Vec<T>, upper: Vec<T>, ny: usize) -> Result<Self, ConfigError> {
        if lower.len() != ny {
            return Err(ConfigError::BoundsLength {
                which: "lower",
                expected: ny,
                got: lower.len(),
            });
        }
        if upper.len() != ny {
            return Err(ConfigError::BoundsLength {
                which: "upper",
                expected: ny,
                got: upper.len(),
            });
        }
        for (index, (lo, up)) in lower.iter().zip(upper.iter()).enumerate() {
            match lo.partial_cmp(up) {
                None => return Err(ConfigError::InvalidBound { index }),
                Some(Ordering::Greater) => return Err(ConfigError::InvertedBounds { index }),
                _ => {}
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> &[T] {
        &self.lower
    }

    pub fn upper(&self) -> &[T] {
        &self.upper
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Whether component `i` has at least one finite bound.
    pub fn is_bounded(&self, i: usize) -> bool {
        self.lower[i].is_finite() || self.upper[i].is_finite()
    }

    /// Whether no component has a finite bound.
    pub fn is_unbounded(&self) -> bool {
        (0..self.len()).all(|i| !self.is_bounded(i))
    }

    /// Index of the first component of `y` outside its bounds.
    pub fn first_violation(&self, y: &[T]) -> Option<usize> {
        y.iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .position(|(y_i, (lo, up))| !(y_i >= lo && y_i <= up))
    }

    /// Largest step `h` such that the Euler predictor `y + h * f` stays
    /// inside the bounds for every component.
    ///
    /// Components with `f_i == 0`, or moving towards an infinite bound, do
    /// not constrain the step. Returns the `no_limit` sentinel when nothing
    /// constrains it and `OutOfBounds` when `y` already violates a bound. The
    /// step is zero when a component rests on a bound and moves outwards.
    pub fn euler_step_limit(&self, y: &[T], f: &[T]) -> EvalResult<T> {
        self.check_state(y, f)?;
        if let Some(index) = self.first_violation(y) {
            return Err(EvalError::OutOfBounds { index });
        }
        Ok(self.step_limit(y, f))
    }

    /// Same as [`euler_step_limit`](Bounds::euler_step_limit) but accepts a
    /// state outside the bounds. A component outside its box and moving
    /// further out limits the step to zero; one moving back in is limited
    /// by the opposite bound.
    pub fn recovery_step_limit(&self, y: &[T], f: &[T]) -> EvalResult<T> {
        self.check_state(y, f)?;
        Ok(self.step_limit(y, f))
    }

    fn check_state(&self, y: &[T], f: &[T]) -> EvalResult {
        check_len("y", y.len(), self.len())?;
        check_len("f", f.len(), self.len())
    }

    fn step_limit(&self, y: &[T], f: &[T]) -> T {
        let mut h_min = sentinel::no_limit::<T>();
        for (i, (y_i, f_i)) in y.iter().zip(f.iter()).take(self.len()).enumerate() {
            let target = if *f_i > T::zero() {
                self.upper[i]
            } else if *f_i < T::zero() {
                self.lower[i]
            } else {
                continue;
            };
            if !target.is_finite() {
                continue;
            }
            // negative only when y_i is already past the target
            let h_i = (target - *y_i) / *f_i;
            let h_i = if h_i < T::zero() { T::zero() } else { h_i.abs() };
            if h_i < h_min {
                h_min = h_i;
            }
        }
        h_min
    }
}
