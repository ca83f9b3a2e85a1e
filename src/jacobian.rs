//! Stride-aware dense Jacobian views and the forward difference fallback.

use nalgebra::{Dyn, MatrixViewMut};

use crate::constants::finite_difference;
use crate::ode_shared::{check_len, EvalResult, FloatNumber};

/// Mutable `ny`×`ny` view into a caller-owned Jacobian buffer. Element
/// `(i, j)` is `df_i/dy_j` whatever the memory layout of the buffer.
pub type JacobianView<'a, T> = MatrixViewMut<'a, T, Dyn, Dyn, Dyn, Dyn>;

/// Memory layout of a dense Jacobian buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Columns are contiguous, `ldim` apart.
    ColumnMajor,
    /// Rows are contiguous, `ldim` apart.
    RowMajor,
}

impl Layout {
    /// Row and column strides for a leading dimension of `ldim`.
    pub fn strides(self, ldim: usize) -> (usize, usize) {
        match self {
            Layout::ColumnMajor => (1, ldim),
            Layout::RowMajor => (ldim, 1),
        }
    }

    /// Offset of element `(i, j)` in the buffer.
    pub fn offset(self, i: usize, j: usize, ldim: usize) -> usize {
        let (rstride, cstride) = self.strides(ldim);
        i * rstride + j * cstride
    }
}

/// Minimum length of a buffer holding a `ny`×`ny` matrix with leading
/// dimension `ldim`, `None` when it does not fit in a `usize`.
pub fn required_len(ny: usize, ldim: usize) -> Option<usize> {
    match ny {
        0 => Some(0),
        _ => (ny - 1).checked_mul(ldim)?.checked_add(ny),
    }
}

/// Wraps `jac` into a [`JacobianView`] after checking `ldim` and the buffer
/// length. Elements outside the `ny`×`ny` block are not reachable through
/// the view.
pub fn dense_view<T: FloatNumber>(
    jac: &mut [T],
    ny: usize,
    ldim: usize,
    layout: Layout,
) -> EvalResult<JacobianView<'_, T>> {
    check_len("ldim", ldim, ny)?;
    // the view's own stride arithmetic reaches ny * ldim + len + ldim
    let fits = ny
        .checked_mul(ldim)
        .and_then(|n| n.checked_add(jac.len()))
        .and_then(|n| n.checked_add(ldim));
    let required = match (fits, required_len(ny, ldim)) {
        (Some(_), Some(required)) => required,
        _ => usize::MAX,
    };
    check_len("jac", jac.len(), required)?;
    let (rstride, cstride) = layout.strides(ldim);
    Ok(JacobianView::from_slice_with_strides_mut(
        jac, ny, ny, rstride, cstride,
    ))
}

/// Approximates the Jacobian (and `df/dt` when requested) by forward
/// differences of `rhs`.
///
/// Column `j` is perturbed by `sqrt(eps) * max(|y_j|, 1)` and time by
/// `sqrt(eps) * max(|t|, 1)`. `fy` is used as the unperturbed derivative
/// when supplied.
pub fn forward_difference<T, F>(
    mut rhs: F,
    t: T,
    y: &[T],
    fy: Option<&[T]>,
    jac: &mut JacobianView<'_, T>,
    dfdt: Option<&mut [T]>,
) -> EvalResult
where
    T: FloatNumber,
    F: FnMut(T, &[T], &mut [T]) -> EvalResult,
{
    let ny = y.len();
    let f0 = match fy {
        Some(fy) => fy.to_vec(),
        None => {
            let mut f0 = vec![T::zero(); ny];
            rhs(t, y, &mut f0)?;
            f0
        }
    };
    let rel = finite_difference::relative_step::<T>();

    let mut y_pert = y.to_vec();
    let mut f_pert = vec![T::zero(); ny];
    for j in 0..ny {
        y_pert[j] = y[j] + rel * y[j].abs().max(T::one());
        // use the increment actually representable in y_pert
        let h = y_pert[j] - y[j];
        rhs(t, &y_pert, &mut f_pert)?;
        for i in 0..ny {
            jac[(i, j)] = (f_pert[i] - f0[i]) / h;
        }
        y_pert[j] = y[j];
    }

    if let Some(dfdt) = dfdt {
        let t_pert = t + rel * t.abs().max(T::one());
        let h = t_pert - t;
        rhs(t_pert, y, &mut f_pert)?;
        for (i, dfdt_i) in dfdt.iter_mut().take(ny).enumerate() {
            *dfdt_i = (f_pert[i] - f0[i]) / h;
        }
    }
    Ok(())
}
