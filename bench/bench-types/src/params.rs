//! Simulator construction parameters and experiment identities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BenchError, ContactParams, IntegratorFamily, Result};

/// Parameters shared by both simulator build entry points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorParams {
    /// Control time step (seconds).
    pub dt: f64,
    /// Integration sub-steps per control step.
    pub ndt: u32,
    /// Contact model parameters.
    pub contact: ContactParams,
}

impl SimulatorParams {
    /// Create simulator parameters.
    #[must_use]
    pub const fn new(dt: f64, ndt: u32, contact: ContactParams) -> Self {
        Self { dt, ndt, contact }
    }

    /// Sub-step duration (seconds).
    #[must_use]
    pub fn sub_dt(&self) -> f64 {
        self.dt / f64::from(self.ndt.max(1))
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(BenchError::invalid_config(format!(
                "invalid timestep: {} (must be positive and finite)",
                self.dt
            )));
        }
        if self.ndt == 0 {
            return Err(BenchError::invalid_config("ndt must be at least 1"));
        }
        self.contact.validate()
    }
}

/// Per-step diagnostics reported by exponential-family simulators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExponentialDiagnostics {
    /// Matrix multiplications spent in the last control step.
    pub matrix_multiplications: u32,
    /// 1-norm of the exponentiated matrix in the last control step.
    pub matrix_norm: f64,
}

/// What an experiment simulates.
///
/// Together with the integrator family this identifies a ground-truth
/// trajectory on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentIdentity {
    /// Robot name (e.g. `"solo"`).
    pub robot: String,
    /// Motion name (e.g. `"squat"`).
    pub motion: String,
    /// Control time step (seconds).
    pub dt: f64,
}

impl ExperimentIdentity {
    /// Create an experiment identity.
    #[must_use]
    pub fn new(robot: impl Into<String>, motion: impl Into<String>, dt: f64) -> Self {
        Self {
            robot: robot.into(),
            motion: motion.into(),
            dt,
        }
    }

    /// Key of this experiment's ground truth for one family.
    #[must_use]
    pub fn ground_truth_key(&self, family: IntegratorFamily) -> GroundTruthKey {
        GroundTruthKey {
            identity: self.clone(),
            family,
        }
    }
}

impl fmt::Display for ExperimentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.robot, self.motion, self.dt)
    }
}

/// Identity tuple of a persisted ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthKey {
    /// Robot, motion, and control time step.
    pub identity: ExperimentIdentity,
    /// Integrator family.
    pub family: IntegratorFamily,
}

impl GroundTruthKey {
    /// File name of the persisted record, e.g. `solo_squat0.01_exp.cgt`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}{}_{}.cgt",
            self.identity.robot,
            self.identity.motion,
            self.identity.dt,
            self.family.key()
        )
    }
}

impl fmt::Display for GroundTruthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.identity, self.family.key())
    }
}
