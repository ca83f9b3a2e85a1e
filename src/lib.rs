//! # ODE system adapter
//! `odesys` sits between generated ordinary differential equation models and the integrator
//! drivers that step them. A model implements [`Model`]; wrapping it in [`OdeSys`] gives the
//! driver-facing [`OdeSystem`] callbacks (right-hand side, dense Jacobians in both memory
//! layouts, root functions, step size advice) together with the [`IterativeOdeSystem`]
//! callbacks used by Krylov linear solvers.

// Re-export from external crate
use nalgebra as na;
pub use crate::na::{DMatrix, DVector};

// Declare modules
pub mod bounds;
pub mod constants;
pub mod jacobian;
pub mod model;
pub mod ode_shared;
pub mod odesys;
pub mod parameters;
pub mod precond;
pub mod settings;
mod step;
pub mod tolerance;

pub use bounds::Bounds;
pub use jacobian::{JacobianView, Layout};
pub use model::Model;
pub use ode_shared::{
    ConfigError, EvalError, EvalResult, FloatNumber, IterativeOdeSystem, OdeSystem, Stats,
};
pub use odesys::OdeSys;
pub use parameters::Parameters;
pub use settings::Settings;
pub use tolerance::Tolerance;
