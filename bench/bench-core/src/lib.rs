//! Experiment orchestration and error analysis for contact integrator
//! benchmarks.
//!
//! Given a simulation engine (through the `bench-engine` seams), this crate
//! measures how far each integrator configuration drifts from a ground truth
//! in a single step, and what that accuracy costs.
//!
//! # Components
//!
//! - [`ContactPointSet`] - Per-contact samples over a run
//! - [`TrajectoryBuffer`] / [`Trajectory`] - Pre-allocated run storage
//! - [`SimulationRunner`] - One configuration end to end, with local-error resets
//! - [`GroundTruthManager`] - Per-family reference runs, cached on disk
//! - [`SweepScheduler`] - Ordered configurations of a sweep
//! - [`ErrorAnalyzer`] - Per-step and aggregate error metrics
//! - [`ResultStore`] - Named results, saved and loaded as one bundle
//! - [`ExperimentSession`] / [`Summary`] - Everything above, chained
//!
//! # Example
//!
//! ```
//! use bench_core::{ExperimentConfig, ExperimentSession, GroundTruthPolicy, InitialState, SweepBounds};
//! use bench_engine::{PdController, PointMassEngine, PointMassModel};
//! use bench_types::{ContactParams, DVector, ExperimentIdentity};
//!
//! let model = PointMassModel::quadruped(1.0, 0.1, 0.1);
//! let config = ExperimentConfig::new(ExperimentIdentity::new("point", "drop", 0.01), 20)
//!     .with_contact_frames(["BL_contact", "BR_contact", "FL_contact", "FR_contact"])
//!     .with_contact(ContactParams::soft())
//!     .with_ground_truth(GroundTruthPolicy {
//!         exponential_micro_step: 0.01 / 32.0,
//!         euler_micro_step: 0.01 / 64.0,
//!     });
//! let initial = InitialState::new(DVector::from_vec(vec![0.0, 0.0, 0.01]), DVector::zeros(3));
//!
//! let session = ExperimentSession::new(&PointMassEngine, &model, config, initial);
//! let report = session
//!     .run(&SweepBounds::new(1..5).euler_only(), || {
//!         PdController::new(0.0, 0.0, 0.01, DVector::zeros(3))
//!     })
//!     .unwrap();
//!
//! assert_eq!(report.summary.len(), 3);
//! println!("{}", report.summary);
//! ```

#![doc(html_root_url = "https://docs.rs/bench-core/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::missing_errors_doc,        // Error docs added where non-obvious
    clippy::module_name_repetitions,   // ErrorMetrics in analysis, etc.
)]

mod analysis;
pub mod bundle;
mod config;
mod contact;
mod ground_truth;
mod report;
mod runner;
mod session;
mod store;
mod sweep;
mod trajectory;

pub use analysis::{ErrorAnalyzer, ErrorMetrics};
pub use config::{ExperimentConfig, GroundTruthPolicy, MetricTarget};
pub use contact::ContactPointSet;
pub use ground_truth::GroundTruthManager;
pub use report::{Series, Summary, SummaryRow};
pub use runner::{InitialState, RunOutcome, SimulationRunner, DIVERGENCE_BOUND};
pub use session::{ExperimentSession, SessionReport};
pub use store::{ResultEntry, ResultStore};
pub use sweep::{SweepBounds, SweepScheduler, DEFAULT_TRUNCATION_ORDERS};
pub use trajectory::{DiagnosticSeries, RunStatus, RunTiming, Trajectory, TrajectoryBuffer};
