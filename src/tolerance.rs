//! Absolute tolerances given either as one broadcast value or per component.

use crate::ode_shared::{ConfigError, FloatNumber};

/// Absolute tolerance of the state variables.
///
/// Using [`From`] a scalar, an array, a slice or a `Vec` can be passed where a
/// `Tolerance` is expected.
#[derive(Clone, Debug, PartialEq)]
pub enum Tolerance<T> {
    Scalar(T),
    Vector(Vec<T>),
}

impl<T: FloatNumber> Tolerance<T> {
    /// Checks the values against a state of dimension `ny`.
    pub(crate) fn validate(&self, ny: usize) -> Result<(), ConfigError> {
        let values = match self {
            Tolerance::Scalar(v) => std::slice::from_ref(v),
            Tolerance::Vector(vs) => {
                if vs.len() != ny {
                    return Err(ConfigError::ToleranceLength {
                        expected: ny,
                        got: vs.len(),
                    });
                }
                vs.as_slice()
            }
        };
        if values.iter().all(|v| is_valid_tolerance(*v)) {
            Ok(())
        } else {
            Err(ConfigError::InvalidTolerance { name: "atol" })
        }
    }

    /// Number of stored values, 1 for a broadcast tolerance.
    pub fn len(&self) -> usize {
        match self {
            Tolerance::Scalar(_) => 1,
            Tolerance::Vector(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tolerances must be finite and non-negative.
pub(crate) fn is_valid_tolerance<T: FloatNumber>(value: T) -> bool {
    value.is_finite() && value >= T::zero()
}

impl<T> From<T> for Tolerance<T> {
    fn from(val: T) -> Self {
        Tolerance::Scalar(val)
    }
}

impl<T> From<Vec<T>> for Tolerance<T> {
    fn from(val: Vec<T>) -> Self {
        Tolerance::Vector(val)
    }
}

impl<T: Clone> From<&[T]> for Tolerance<T> {
    fn from(val: &[T]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl<T, const N: usize> From<[T; N]> for Tolerance<T> {
    fn from(val: [T; N]) -> Self {
        Tolerance::Vector(Vec::from(val))
    }
}

impl<T> std::ops::Index<usize> for Tolerance<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Tolerance::Scalar(v) => v,
            Tolerance::Vector(vs) => &vs[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_broadcasts() {
        let atol: Tolerance<f64> = 1e-6.into();
        assert_eq!(atol[0], 1e-6);
        assert_eq!(atol[41], 1e-6);
        assert_eq!(atol.len(), 1);
        assert!(atol.validate(3).is_ok());
    }

    #[test]
    fn vector_is_indexed() {
        let atol: Tolerance<f64> = [1e-6, 1e-9].into();
        assert_eq!(atol[1], 1e-9);
        assert!(atol.validate(2).is_ok());
        assert_eq!(
            atol.validate(3),
            Err(ConfigError::ToleranceLength {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn rejects_negative_and_nan() {
        let negative: Tolerance<f64> = vec![1e-6, -1e-9].into();
        assert_eq!(
            negative.validate(2),
            Err(ConfigError::InvalidTolerance { name: "atol" })
        );
        let nan: Tolerance<f64> = f64::NAN.into();
        assert!(nan.validate(1).is_err());
        let zero: Tolerance<f64> = 0.0.into();
        assert!(zero.validate(4).is_ok());
    }
}
