use approx::assert_relative_eq;
use odesys::{
    ConfigError, EvalError, EvalResult, JacobianView, Model, OdeSys, OdeSystem, Parameters,
    Settings,
};

type Time = f64;

struct Decay;

// Implement the ODE dy/dt = -k * y
impl Model<f64> for Decay {
    const NY: usize = 1;
    const NPARAMS: usize = 1;

    fn rhs(&self, _t: Time, y: &[f64], p: &Parameters<f64>, f: &mut [f64]) -> EvalResult {
        f[0] = -p[0] * y[0];
        Ok(())
    }

    fn jac(
        &self,
        _t: Time,
        _y: &[f64],
        _fy: Option<&[f64]>,
        p: &Parameters<f64>,
        jac: &mut JacobianView<'_, f64>,
        _dfdt: Option<&mut [f64]>,
    ) -> EvalResult {
        jac[(0, 0)] = -p[0];
        Ok(())
    }
}

struct Drain;

// dy/dt = -k * y - 1 keeps pushing y below zero
impl Model<f64> for Drain {
    const NY: usize = 1;
    const NPARAMS: usize = 1;

    fn rhs(&self, _t: Time, y: &[f64], p: &Parameters<f64>, f: &mut [f64]) -> EvalResult {
        f[0] = -p[0] * y[0] - 1.0;
        Ok(())
    }
}

/// Decay with k = 1 and y in [0, inf).
fn decay(rtol: f64, atol: f64) -> OdeSys<Decay> {
    let settings = Settings::new(rtol, atol).lower_bounds(vec![0.0]);
    OdeSys::new(Decay, &[1.0], settings).unwrap()
}

#[test]
fn test_rhs() {
    let odesys = decay(1e-6, 1e-8);
    assert_eq!(odesys.get_ny(), 1);
    assert_eq!(odesys.get_nroots(), 0);

    let mut f = [0.0];
    odesys.rhs(0.0, &[1.0], &mut f).unwrap();
    assert_eq!(f, [-1.0]);
}

#[test]
fn test_dense_jacobian() {
    let odesys = decay(1e-6, 1e-8);
    let mut cmaj = [0.0];
    let mut rmaj = [0.0];
    let mut dfdt = [1.0];
    odesys
        .dense_jac_cmaj(0.0, &[1.0], None, &mut cmaj, 1, Some(&mut dfdt))
        .unwrap();
    odesys
        .dense_jac_rmaj(0.0, &[1.0], Some(&[-1.0]), &mut rmaj, 1, None)
        .unwrap();
    assert_eq!(cmaj, [-1.0]);
    assert_eq!(rmaj, [-1.0]);
    assert_eq!(dfdt, [0.0]);
}

#[test]
fn test_max_euler_step() {
    let odesys = decay(1e-6, 1e-8);
    // y + h * f reaches the lower bound 0 after h = 1
    assert_eq!(odesys.max_euler_step(0.0, &[1.0]).unwrap(), 1.0);
    assert_eq!(odesys.get_dx_max(0.0, &[1.0]), 1.0);
    // at the bound f = 0, nothing constrains the step
    assert_eq!(odesys.get_dx_max(0.0, &[0.0]), f64::INFINITY);
}

#[test]
fn test_get_dx_max_keeps_state_in_bounds() {
    let odesys = decay(1e-6, 1e-8);
    for y0 in [1e-3, 0.5, 2.0, 1e4] {
        let h = odesys.get_dx_max(0.0, &[y0]);
        let mut f = [0.0];
        odesys.rhs(0.0, &[y0], &mut f).unwrap();
        assert!(h > 0.0);
        assert!(y0 + h * f[0] >= 0.0);
    }
}

#[test]
fn test_get_dx0() {
    let odesys = decay(1e-6, 1e-8);
    let h0 = odesys.get_dx0(0.0, &[1.0]).unwrap();
    assert!(h0 > 0.0);
    assert!(h0 < 1e-3);
    assert_relative_eq!(h0, 0.01 * (1e-6 + 1e-8), max_relative = 1e-12);
}

#[test]
fn test_get_dx0_is_monotone_in_tolerances() {
    let y = [0.7];
    let mut previous = f64::INFINITY;
    for k in 0..14 {
        let h0 = decay(10f64.powi(-k), 1e-8).get_dx0(0.0, &y).unwrap();
        assert!(h0 <= previous);
        previous = h0;
    }
    let mut previous = f64::INFINITY;
    for k in 0..14 {
        let h0 = decay(1e-6, 10f64.powi(-k)).get_dx0(0.0, &y).unwrap();
        assert!(h0 <= previous);
        previous = h0;
    }
}

#[test]
fn test_get_dx0_without_tolerance() {
    let odesys = decay(0.0, 0.0);
    assert_eq!(odesys.get_dx0(0.0, &[1.0]), None);
}

#[test]
fn test_parameter_count() {
    let result = OdeSys::with_tolerances(Decay, &[1.0, 2.0], 1e-8, 1e-6);
    assert_eq!(
        result.err(),
        Some(ConfigError::ParameterCount {
            expected: 1,
            got: 2
        })
    );
    assert!(OdeSys::with_tolerances(Decay, &[], 1e-8, 1e-6).is_err());
}

#[test]
fn test_dynamic_dispatch() {
    let odesys = decay(1e-6, 1e-8);
    let driver_view: &dyn OdeSystem<f64> = &odesys;
    let mut f = [0.0];
    driver_view.rhs(0.0, &[2.0], &mut f).unwrap();
    assert_eq!(f, [-2.0]);
    assert_eq!(driver_view.get_dx_max(0.0, &[2.0]), 1.0);
    assert_eq!(odesys.stats().nfev, 2);
}

#[test]
fn test_get_dx_max_past_the_bound() {
    let settings = Settings::new(1e-6, 1e-8).lower_bounds(vec![0.0]);
    let odesys = OdeSys::new(Drain, &[1.0], settings).unwrap();
    assert_eq!(odesys.get_dx_max(0.0, &[1.0]), 0.5);

    // rounding left y just below zero and f still points outwards
    let y = [-1e-15];
    let h = odesys.get_dx_max(0.0, &y);
    let mut f = [0.0];
    odesys.rhs(0.0, &y, &mut f).unwrap();
    assert_eq!(h, 0.0);
    assert!((y[0] + h * f[0]).is_finite());
    assert!(odesys.max_euler_step(0.0, &y).is_err());
}

#[test]
fn test_oversized_leading_dimension() {
    let odesys = decay(1e-6, 1e-8);
    let mut jac = [0.0];
    for ldim in [usize::MAX, usize::MAX / 2 + 1] {
        assert!(matches!(
            odesys.dense_jac_cmaj(0.0, &[1.0], None, &mut jac, ldim, None),
            Err(EvalError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            odesys.dense_jac_rmaj(0.0, &[1.0], None, &mut jac, ldim, None),
            Err(EvalError::DimensionMismatch { .. })
        ));
    }
    assert_eq!(odesys.stats().njev, 0);
}
