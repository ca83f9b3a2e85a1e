//! Step size heuristics offered to the driver.

use std::cmp::Ordering;

use crate::constants::{initial_step as dx0, sentinel};
use crate::ode_shared::FloatNumber;
use crate::tolerance::Tolerance;

/// Step over which each component changes by about its error tolerance:
/// `min_i (rtol * |y_i| + atol_i) / max(|f_i|, eps)`.
///
/// Returns the `no_limit` sentinel for an empty state and NaN if any
/// component is NaN. `atol` must cover every component of `y`.
pub(crate) fn tolerance_step<T: FloatNumber>(
    rtol: T,
    atol: &Tolerance<T>,
    y: &[T],
    f: &[T],
) -> T {
    let floor = dx0::derivative_floor::<T>();
    let mut h = sentinel::no_limit::<T>();
    for (i, (&y_i, &f_i)) in y.iter().zip(f.iter()).enumerate() {
        let sc_i = rtol * y_i.abs() + atol[i];
        let mag = f_i.abs();
        let h_i = sc_i / if mag < floor { floor } else { mag };
        match h_i.partial_cmp(&h) {
            None => return h_i,
            Some(Ordering::Less) => h = h_i,
            _ => {}
        }
    }
    h
}

/// Compute the initial stepsize.
///
/// The tolerance-limited step is scaled by the safety factor (0.01) and
/// capped by half of the bound-limited Euler step `bound_step`. Smaller
/// tolerances or larger derivatives never give a larger step. Returns `None`
/// unless the result is finite and strictly positive.
pub(crate) fn initial_step<T: FloatNumber>(
    rtol: T,
    atol: &Tolerance<T>,
    y: &[T],
    f: &[T],
    bound_step: T,
) -> Option<T> {
    let h_tol = dx0::safety_factor::<T>() * tolerance_step(rtol, atol, y, f);
    let h_bound = dx0::bound_fraction::<T>() * bound_step;
    // keeps a NaN h_tol
    let h0 = if h_bound < h_tol { h_bound } else { h_tol };
    if h0.is_finite() && h0 > T::zero() {
        Some(h0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tolerance_step_picks_most_restrictive_component() {
        let atol = Tolerance::Vector(vec![1e-8, 1e-6]);
        let h = tolerance_step(1e-6, &atol, &[1.0, 2.0], &[-1.0, 100.0]);
        // (1e-6 + 1e-8) / 1 vs (2e-6 + 1e-6) / 100
        assert_relative_eq!(h, 3e-8, max_relative = 1e-12);
    }

    #[test]
    fn zero_derivative_uses_floor() {
        let h: f64 = tolerance_step(0.0, &Tolerance::Scalar(1e-8), &[1.0], &[0.0]);
        assert!(h.is_finite());
        assert!(h > 1e6);
    }

    #[test]
    fn initial_step_is_capped_by_bounds() {
        let atol = Tolerance::Scalar(1e-2);
        let h0 = initial_step(1e-2, &atol, &[1.0], &[-1.0], 1e-4).unwrap();
        assert_relative_eq!(h0, 5e-5, max_relative = 1e-12);
        let h0 = initial_step(1e-2, &atol, &[1.0], &[-1.0], f64::INFINITY).unwrap();
        assert_relative_eq!(h0, 2e-4, max_relative = 1e-12);
    }

    #[test]
    fn initial_step_fails_without_tolerance() {
        let atol = Tolerance::Scalar(0.0);
        assert_eq!(initial_step(0.0, &atol, &[1.0], &[0.0], f64::INFINITY), None);
        assert_eq!(initial_step(0.0, &atol, &[1.0], &[3.0], f64::INFINITY), None);
        assert_eq!(initial_step::<f64>(1e-6, &atol, &[], &[], f64::INFINITY), None);
    }

    #[test]
    fn nan_derivative_is_not_hidden() {
        let atol = Tolerance::Scalar(1e-8);
        assert!(tolerance_step(1e-6, &atol, &[1.0, 1.0], &[f64::NAN, 1.0]).is_nan());
        assert_eq!(initial_step(1e-6, &atol, &[1.0], &[f64::NAN], 1.0), None);
    }

    #[test]
    fn initial_step_fails_on_a_bound() {
        let atol = Tolerance::Scalar(1e-8);
        assert_eq!(initial_step(1e-6, &atol, &[0.0], &[-1.0], 0.0), None);
    }

    #[test]
    fn tighter_tolerances_never_grow_the_step() {
        let y = [1.0, 0.1, -3.0];
        let f = [-1.0, 20.0, 0.5];
        let mut previous = f64::INFINITY;
        for k in 0..12 {
            let tol = 10f64.powi(-k);
            let h0 = initial_step(tol, &Tolerance::Scalar(tol), &y, &f, 4.0).unwrap();
            assert!(h0 <= previous);
            previous = h0;
        }
    }
}
