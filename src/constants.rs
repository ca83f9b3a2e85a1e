use nalgebra::convert;

use crate::ode_shared::FloatNumber;

/// Out-of-range values standing in for "no bound" and "no limit".
pub mod sentinel {
    use super::{convert, FloatNumber};

    /// Upper bound of an unbounded component: `+inf`
    pub fn no_upper_bound<T: FloatNumber>() -> T {
        convert(f64::INFINITY)
    }

    /// Lower bound of an unbounded component: `-inf`
    pub fn no_lower_bound<T: FloatNumber>() -> T {
        convert(f64::NEG_INFINITY)
    }

    /// Step limit when no component constrains the step: `+inf`
    pub fn no_limit<T: FloatNumber>() -> T {
        convert(f64::INFINITY)
    }
}

/// Initial step size computation constants
pub mod initial_step {
    use super::{convert, FloatNumber};

    /// Safety factor applied to the tolerance-limited step
    pub fn safety_factor<T: FloatNumber>() -> T {
        convert(0.01)
    }

    /// Fraction of the distance to the nearest bound the first step may cover
    pub fn bound_fraction<T: FloatNumber>() -> T {
        convert(0.5)
    }

    /// Smallest derivative magnitude used as a divisor
    pub fn derivative_floor<T: FloatNumber>() -> T {
        T::default_epsilon()
    }
}

/// Maximum step size computation constants
pub mod max_step {
    use super::{convert, FloatNumber};

    /// Default fraction of the bound-limited Euler step returned to the driver
    pub fn default_factor<T: FloatNumber>() -> T {
        convert(1.0)
    }
}

/// Forward difference Jacobian constants
pub mod finite_difference {
    use super::FloatNumber;

    /// Relative perturbation, square root of the machine epsilon
    pub fn relative_step<T: FloatNumber>() -> T {
        T::default_epsilon().sqrt()
    }
}

/// Default tolerances of [`Settings`](crate::settings::Settings)
pub mod tolerance {
    use super::{convert, FloatNumber};

    pub fn default_rtol<T: FloatNumber>() -> T {
        convert(1.0e-8)
    }

    pub fn default_atol<T: FloatNumber>() -> T {
        convert(1.0e-8)
    }
}
