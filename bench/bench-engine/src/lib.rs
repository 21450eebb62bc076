//! Simulation engine seams and a reference compliant-contact engine.
//!
//! The benchmark harness talks to physics only through the traits in this
//! crate:
//!
//! - [`RobotModel`] - Sizes and frame lookup
//! - [`SimulationEngine`] - Builds a simulator per integrator family
//! - [`Simulator`] - Contact points, state resets, stepping
//! - [`Controller`] - Control input per step
//!
//! # Reference Engine
//!
//! [`PointMassEngine`] implements the seams for a translating rigid body with
//! compliant ground contacts. It is small enough to run thousands of
//! benchmark steps in tests, yet exercises everything the harness depends on:
//! hidden anchor state, unilateral contacts with friction cones, the Euler
//! and exponential families, and exponential diagnostics.
//!
//! # Example
//!
//! ```
//! use bench_engine::{Controller, PdController, PointMassModel};
//! use bench_types::DVector;
//!
//! let model = PointMassModel::quadruped(1.0, 0.1, 0.1);
//! let mut controller = PdController::new(0.0, 0.0, 0.01, model.gravity_compensation());
//! controller.reset(&DVector::zeros(3), &DVector::zeros(3), 0.0);
//!
//! let u = controller.compute_control(&DVector::zeros(3), &DVector::zeros(3));
//! assert!(u[2] > 0.0);
//! ```

#![doc(html_root_url = "https://docs.rs/bench-engine/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::missing_errors_doc,        // Error docs added where non-obvious
    clippy::many_single_char_names,    // Physics notation (p, v, a, h)
)]

mod contact;
mod controller;
pub mod expm;
mod point_mass;
mod traits;

pub use controller::{PdController, SinusoidalReference};
pub use expm::{ExpmResult, MatrixExponential};
pub use point_mass::{PointMassEngine, PointMassModel, PointMassSimulator, GRAVITY};
pub use traits::{Controller, RobotModel, SimulationEngine, Simulator};
