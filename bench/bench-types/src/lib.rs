//! Core types for contact integrator benchmarking.
//!
//! This crate provides the data shared by the benchmark engine seam and the
//! experiment harness:
//!
//! - [`Configuration`] - One integrator variant (family, sub-steps, knobs)
//! - [`IntegratorSettings`] - Family-specific knobs as a tagged union
//! - [`ContactPointSample`] - Per-contact force/position/anchor/status sample
//! - [`ContactParams`] / [`SimulatorParams`] - Simulator construction inputs
//! - [`ExperimentIdentity`] / [`GroundTruthKey`] - Identity of cached references
//! - [`BenchError`] - The error taxonomy
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They carry no dynamics and no orchestration;
//! they are the common language between simulation engines, the runner, and
//! persisted result bundles.
//!
//! # Example
//!
//! ```
//! use bench_types::{Configuration, EulerSettings, IntegratorFamily};
//!
//! let config = Configuration::euler(4, EulerSettings::default()).unwrap();
//! assert_eq!(config.family(), IntegratorFamily::ExplicitEuler);
//! assert_eq!(config.method(), "euler");
//! ```

#![doc(html_root_url = "https://docs.rs/bench-types/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod contact;
mod error;
mod integrator;
mod params;

pub use contact::{ContactHandle, ContactParams, ContactPointSample, FrameId};
pub use error::BenchError;
pub use integrator::{
    Configuration, EulerSettings, ExponentialSettings, ForwardDynamics, IntegratorFamily,
    IntegratorSettings, TruncationOrder,
};
pub use params::{ExperimentIdentity, ExponentialDiagnostics, GroundTruthKey, SimulatorParams};

// Re-export math types for convenience
pub use nalgebra::{DVector, Matrix3, Vector3};

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;
