//! Adapter exposing a [`Model`] through the driver-facing traits.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::bounds::Bounds;
use crate::constants::sentinel;
use crate::jacobian::{dense_view, Layout};
use crate::model::Model;
use crate::ode_shared::*;
use crate::parameters::Parameters;
use crate::precond::Preconditioner;
use crate::settings::Settings;
use crate::step::initial_step;
use crate::tolerance::{is_valid_tolerance, Tolerance};

/// Evaluation counters. Relaxed atomics, so a shared adapter may be
/// evaluated from several threads on independent buffers.
#[derive(Debug, Default)]
struct Counters {
    nfev: AtomicUsize,
    njev: AtomicUsize,
    nrev: AtomicUsize,
    njvev: AtomicUsize,
    nprec_setup: AtomicUsize,
    nprec_solve: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> Stats {
        Stats {
            nfev: self.nfev.load(Ordering::Relaxed),
            njev: self.njev.load(Ordering::Relaxed),
            nrev: self.nrev.load(Ordering::Relaxed),
            njvev: self.njvev.load(Ordering::Relaxed),
            nprec_setup: self.nprec_setup.load(Ordering::Relaxed),
            nprec_solve: self.nprec_solve.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// ODE system adapter: owns the parameters, tolerances and bounds of one
/// integration run and evaluates the model `M` into caller-owned buffers.
///
/// Apart from the evaluation counters and the preconditioner cache (which
/// needs `&mut self`), every operation is a pure function of its arguments
/// and the construction-time data.
pub struct OdeSys<M, T: FloatNumber = f64> {
    model: M,
    params: Parameters<T>,
    atol: Tolerance<T>,
    rtol: T,
    bounds: Bounds<T>,
    first_step: Option<T>,
    dx_max_factor: T,
    check_finite: bool,
    counters: Counters,
    precond: Preconditioner<T>,
}

impl<M, T> OdeSys<M, T>
where
    M: Model<T>,
    T: FloatNumber,
{
    /// Creates the adapter.
    ///
    /// # Arguments
    ///
    /// * `model`       - Structure implementing the Model<T> trait
    /// * `params`      - Primary parameters, exactly `M::NPARAMS` of them
    /// * `settings`    - Tolerances, bounds, extra parameters and step heuristic settings
    ///
    pub fn new(model: M, params: &[T], settings: Settings<T>) -> Result<Self, ConfigError> {
        if params.len() != M::NPARAMS {
            return Err(ConfigError::ParameterCount {
                expected: M::NPARAMS,
                got: params.len(),
            });
        }
        if !is_valid_tolerance(settings.rtol) {
            return Err(ConfigError::InvalidTolerance { name: "rtol" });
        }
        settings.atol.validate(M::NY)?;

        let bounds = match (settings.lower_bounds, settings.upper_bounds) {
            (None, None) => Bounds::unbounded(M::NY),
            (lower, upper) => Bounds::new(
                lower.unwrap_or_else(|| vec![sentinel::no_lower_bound(); M::NY]),
                upper.unwrap_or_else(|| vec![sentinel::no_upper_bound(); M::NY]),
                M::NY,
            )?,
        };

        if !(settings.dx_max_factor > T::zero() && settings.dx_max_factor <= T::one()) {
            return Err(ConfigError::InvalidFactor {
                name: "dx_max_factor",
            });
        }
        if let Some(h) = settings.first_step {
            if !(h.is_finite() && h > T::zero()) {
                return Err(ConfigError::InvalidFirstStep);
            }
        }

        let values = params.to_vec();
        let derived = model.derive_parameters(&values, &settings.extra_parameters);
        debug!(
            "ODE system with ny = {}, {} parameters ({} extra, {} derived), {} root functions",
            M::NY,
            M::NPARAMS,
            settings.extra_parameters.len(),
            derived.len(),
            M::NROOTS
        );

        Ok(Self {
            model,
            params: Parameters::new(values, settings.extra_parameters, derived),
            atol: settings.atol,
            rtol: settings.rtol,
            bounds,
            first_step: settings.first_step,
            dx_max_factor: settings.dx_max_factor,
            check_finite: settings.check_finite,
            counters: Counters::default(),
            precond: Preconditioner::new(),
        })
    }

    /// Creates an unbounded adapter with the given tolerances.
    pub fn with_tolerances(
        model: M,
        params: &[T],
        atol: impl Into<Tolerance<T>>,
        rtol: T,
    ) -> Result<Self, ConfigError> {
        Self::new(model, params, Settings::new(rtol, atol))
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn parameters(&self) -> &Parameters<T> {
        &self.params
    }

    pub fn absolute_tolerances(&self) -> &Tolerance<T> {
        &self.atol
    }

    pub fn relative_tolerance(&self) -> T {
        self.rtol
    }

    pub fn bounds(&self) -> &Bounds<T> {
        &self.bounds
    }

    /// Number of calls to [`roots`](OdeSystem::roots) so far.
    pub fn root_evaluation_count(&self) -> usize {
        self.counters.nrev.load(Ordering::Relaxed)
    }

    /// Snapshot of the evaluation counters.
    pub fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    /// Largest step keeping the Euler predictor `y + h * f(t, y)` inside the
    /// bounds. Positive infinity when no component is constrained.
    ///
    /// Fails when `y` already lies outside the bounds or when the right-hand
    /// side cannot be evaluated. Never returns a negative or NaN step.
    pub fn max_euler_step(&self, t: T, y: &[T]) -> EvalResult<T> {
        match self.bound_derivative(t, y)? {
            Some(f) => self.bounds.euler_step_limit(&y[..M::NY], &f),
            None => Ok(sentinel::no_limit()),
        }
    }

    /// Right-hand side used by the bound checks, `None` when no component
    /// is bounded.
    fn bound_derivative(&self, t: T, y: &[T]) -> EvalResult<Option<Vec<T>>> {
        check_len("y", y.len(), M::NY)?;
        if self.bounds.is_unbounded() {
            return Ok(None);
        }
        let mut f = vec![T::zero(); M::NY];
        self.rhs(t, y, &mut f)?;
        Ok(Some(f))
    }

    /// Dense Jacobian collected into an owned column-major matrix.
    pub fn jacobian(&self, t: T, y: &[T], fy: Option<&[T]>) -> EvalResult<DMatrix<T>> {
        let mut jac = DMatrix::zeros(M::NY, M::NY);
        self.dense_jac(t, y, fy, jac.as_mut_slice(), M::NY, None, Layout::ColumnMajor)?;
        Ok(jac)
    }

    fn check_output(&self, buffer: &'static str, values: &[T]) -> EvalResult {
        if !self.check_finite {
            return Ok(());
        }
        match values.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(EvalError::NonFinite { buffer, index }),
            None => Ok(()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn dense_jac(
        &self,
        t: T,
        y: &[T],
        fy: Option<&[T]>,
        jac: &mut [T],
        ldim: usize,
        dfdt: Option<&mut [T]>,
        layout: Layout,
    ) -> EvalResult {
        let ny = M::NY;
        check_len("y", y.len(), ny)?;
        if let Some(fy) = fy {
            check_len("fy", fy.len(), ny)?;
        }
        if let Some(dfdt) = dfdt.as_deref() {
            check_len("dfdt", dfdt.len(), ny)?;
        }
        let mut view = dense_view(jac, ny, ldim, layout)?;
        bump(&self.counters.njev);

        view.fill(T::zero());
        let mut dfdt = dfdt.map(|dfdt| &mut dfdt[..ny]);
        if let Some(dfdt) = dfdt.as_deref_mut() {
            dfdt.fill(T::zero());
        }
        self.model.jac(
            t,
            &y[..ny],
            fy.map(|fy| &fy[..ny]),
            &self.params,
            &mut view,
            dfdt.as_deref_mut(),
        )?;

        if self.check_finite {
            if let Some(k) = view.iter().position(|v| !v.is_finite()) {
                // the view iterates column by column
                let (i, j) = (k % ny, k / ny);
                return Err(EvalError::NonFinite {
                    buffer: "jac",
                    index: layout.offset(i, j, ldim),
                });
            }
        }
        match dfdt {
            Some(dfdt) => self.check_output("dfdt", dfdt),
            None => Ok(()),
        }
    }
}

impl<M, T> OdeSystem<T> for OdeSys<M, T>
where
    M: Model<T>,
    T: FloatNumber,
{
    fn get_ny(&self) -> usize {
        M::NY
    }

    fn get_nroots(&self) -> usize {
        M::NROOTS
    }

    fn rhs(&self, t: T, y: &[T], f: &mut [T]) -> EvalResult {
        check_len("y", y.len(), M::NY)?;
        check_len("f", f.len(), M::NY)?;
        bump(&self.counters.nfev);
        let f = &mut f[..M::NY];
        self.model.rhs(t, &y[..M::NY], &self.params, f)?;
        self.check_output("f", f)
    }

    fn dense_jac_cmaj(
        &self,
        t: T,
        y: &[T],
        fy: Option<&[T]>,
        jac: &mut [T],
        ldim: usize,
        dfdt: Option<&mut [T]>,
    ) -> EvalResult {
        self.dense_jac(t, y, fy, jac, ldim, dfdt, Layout::ColumnMajor)
    }

    fn dense_jac_rmaj(
        &self,
        t: T,
        y: &[T],
        fy: Option<&[T]>,
        jac: &mut [T],
        ldim: usize,
        dfdt: Option<&mut [T]>,
    ) -> EvalResult {
        self.dense_jac(t, y, fy, jac, ldim, dfdt, Layout::RowMajor)
    }

    fn roots(&self, t: T, y: &[T], out: &mut [T]) -> EvalResult {
        // counted whatever the outcome
        bump(&self.counters.nrev);
        check_len("y", y.len(), M::NY)?;
        check_len("out", out.len(), M::NROOTS)?;
        let out = &mut out[..M::NROOTS];
        self.model.roots(t, &y[..M::NY], &self.params, out)?;
        self.check_output("out", out)
    }

    fn get_dx0(&self, t: T, y: &[T]) -> Option<T> {
        if self.first_step.is_some() {
            return self.first_step;
        }
        let mut f = vec![T::zero(); M::NY];
        if let Err(err) = self.rhs(t, y, &mut f) {
            debug!("No initial step estimate at t = {:?}: {}", t, err);
            return None;
        }
        let y = &y[..M::NY];
        let bound_step = match self.bounds.euler_step_limit(y, &f) {
            Ok(h) => h,
            Err(err) => {
                debug!("No initial step estimate at t = {:?}: {}", t, err);
                return None;
            }
        };
        let h0 = initial_step(self.rtol, &self.atol, y, &f, bound_step);
        if h0.is_none() {
            debug!(
                "No initial step estimate at t = {:?}: tolerances or bounds leave no room",
                t
            );
        }
        h0
    }

    fn get_dx_max(&self, t: T, y: &[T]) -> T {
        let f = match self.bound_derivative(t, y) {
            Ok(Some(f)) => f,
            Ok(None) => return sentinel::no_limit(),
            Err(err) => {
                warn!("Step size left unconstrained at t = {:?}: {}", t, err);
                return sentinel::no_limit();
            }
        };
        let y = &y[..M::NY];
        if let Some(index) = self.bounds.first_violation(y) {
            warn!(
                "Component {} outside its bounds at t = {:?}, no step may push it further out",
                index, t
            );
        }
        match self.bounds.recovery_step_limit(y, &f) {
            Ok(h) => self.dx_max_factor * h,
            Err(err) => {
                warn!("Step size left unconstrained at t = {:?}: {}", t, err);
                sentinel::no_limit()
            }
        }
    }
}

impl<M, T> IterativeOdeSystem<T> for OdeSys<M, T>
where
    M: Model<T>,
    T: FloatNumber,
{
    fn jac_times_vec(
        &self,
        vec: &[T],
        out: &mut [T],
        t: T,
        y: &[T],
        fy: Option<&[T]>,
    ) -> EvalResult {
        check_len("vec", vec.len(), M::NY)?;
        check_len("out", out.len(), M::NY)?;
        let jac = self.jacobian(t, y, fy)?;
        bump(&self.counters.njvev);
        let product = jac * DVector::from_column_slice(&vec[..M::NY]);
        out[..M::NY].copy_from_slice(product.as_slice());
        Ok(())
    }

    fn prec_setup(
        &mut self,
        t: T,
        y: &[T],
        fy: Option<&[T]>,
        jok: bool,
        gamma: T,
    ) -> EvalResult<bool> {
        bump(&self.counters.nprec_setup);
        let recompute = !jok || self.precond.jacobian().is_none();
        if recompute {
            let jac = self.jacobian(t, y, fy)?;
            self.precond.store_jacobian(jac);
        }
        self.precond.factorize(gamma)?;
        Ok(recompute)
    }

    fn prec_solve_left(&self, r: &[T], z: &mut [T]) -> EvalResult {
        bump(&self.counters.nprec_solve);
        self.precond.solve(r, z)
    }
}
