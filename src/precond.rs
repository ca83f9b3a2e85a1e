//! Preconditioner `I - gamma * J` for drivers using iterative linear solvers.

use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};

use crate::ode_shared::{check_len, EvalError, EvalResult, FloatNumber};

/// Cached Jacobian and LU factors of `I - gamma * J`.
#[derive(Debug)]
pub struct Preconditioner<T: FloatNumber> {
    jac: Option<DMatrix<T>>,
    lu: Option<LU<T, Dyn, Dyn>>,
    gamma: T,
}

impl<T: FloatNumber> Default for Preconditioner<T> {
    fn default() -> Self {
        Self {
            jac: None,
            lu: None,
            gamma: T::zero(),
        }
    }
}

impl<T: FloatNumber> Preconditioner<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jacobian the factors were last built from.
    pub fn jacobian(&self) -> Option<&DMatrix<T>> {
        self.jac.as_ref()
    }

    /// `gamma` of the current factorization.
    pub fn gamma(&self) -> Option<T> {
        self.lu.as_ref().map(|_| self.gamma)
    }

    /// Replaces the cached Jacobian and drops the factors built from the
    /// previous one.
    pub fn store_jacobian(&mut self, jac: DMatrix<T>) {
        self.jac = Some(jac);
        self.lu = None;
    }

    /// Factorizes `I - gamma * J` with the cached Jacobian.
    pub fn factorize(&mut self, gamma: T) -> EvalResult {
        let jac = self.jac.as_ref().ok_or(EvalError::PreconditionerNotSetUp)?;
        let n = jac.nrows();
        let lu = (DMatrix::identity(n, n) - jac * gamma).lu();
        if !lu.is_invertible() {
            self.lu = None;
            return Err(EvalError::SingularMatrix);
        }
        self.lu = Some(lu);
        self.gamma = gamma;
        Ok(())
    }

    /// Solves `(I - gamma * J) z = r`.
    pub fn solve(&self, r: &[T], z: &mut [T]) -> EvalResult {
        let (jac, lu) = match (self.jac.as_ref(), self.lu.as_ref()) {
            (Some(jac), Some(lu)) => (jac, lu),
            _ => return Err(EvalError::PreconditionerNotSetUp),
        };
        let n = jac.nrows();
        check_len("r", r.len(), n)?;
        check_len("z", z.len(), n)?;
        let mut b = DVector::from_column_slice(&r[..n]);
        if !lu.solve_mut(&mut b) {
            return Err(EvalError::SingularMatrix);
        }
        z[..n].copy_from_slice(b.as_slice());
        Ok(())
    }
}
