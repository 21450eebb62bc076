//! Experiment configuration.
//!
//! One [`ExperimentConfig`] value describes everything a session needs beyond
//! the engine and the model: which experiment it is (robot, motion, control
//! step), how long it runs, which frames touch the ground and how, and how
//! ground truths and errors are computed. It is threaded through constructors;
//! nothing reads settings from process-wide state.

use bench_types::{BenchError, ContactParams, ExperimentIdentity, IntegratorFamily, Result};
use serde::{Deserialize, Serialize};

/// Largest ground-truth sub-step exponent accepted (`ndt = 2^30`).
const MAX_GROUND_TRUTH_EXPONENT: u32 = 30;

/// Which state vector errors are measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricTarget {
    /// Generalized velocity.
    #[default]
    Velocity,
    /// Generalized configuration.
    Configuration,
}

/// Target sub-step duration of each family's ground truth.
///
/// Defaults: `1e-3/64` s for the exponential family and `1e-3/512` s for the
/// Euler family, whose first-order error needs the finer reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroundTruthPolicy {
    /// Micro step of the exponential ground truth (seconds).
    pub exponential_micro_step: f64,
    /// Micro step of the Euler ground truth (seconds).
    pub euler_micro_step: f64,
}

impl Default for GroundTruthPolicy {
    fn default() -> Self {
        Self {
            exponential_micro_step: 1e-3 / 64.0,
            euler_micro_step: 1e-3 / 512.0,
        }
    }
}

impl GroundTruthPolicy {
    /// Micro step for a family.
    #[must_use]
    pub fn micro_step(&self, family: IntegratorFamily) -> f64 {
        match family {
            IntegratorFamily::Exponential => self.exponential_micro_step,
            IntegratorFamily::ExplicitEuler => self.euler_micro_step,
        }
    }

    /// Ground-truth sub-step count `2^k`, with `k` the smallest integer such
    /// that `dt / 2^k` does not exceed the family's micro step.
    ///
    /// # Example
    ///
    /// ```
    /// use bench_core::GroundTruthPolicy;
    /// use bench_types::IntegratorFamily;
    ///
    /// let policy = GroundTruthPolicy::default();
    /// assert_eq!(policy.ndt_for(0.01, IntegratorFamily::Exponential).unwrap(), 1024);
    /// ```
    pub fn ndt_for(&self, dt: f64, family: IntegratorFamily) -> Result<u32> {
        let micro = self.micro_step(family);
        if !micro.is_finite() || micro <= 0.0 {
            return Err(BenchError::invalid_config(format!(
                "{family} ground-truth micro step must be positive, got {micro}"
            )));
        }
        let mut ndt: u32 = 1;
        for _ in 0..=MAX_GROUND_TRUTH_EXPONENT {
            if dt / f64::from(ndt) <= micro {
                return Ok(ndt);
            }
            ndt *= 2;
        }
        Err(BenchError::invalid_config(format!(
            "{family} ground truth for dt={dt} needs more than 2^{MAX_GROUND_TRUTH_EXPONENT} sub-steps"
        )))
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<()> {
        for family in IntegratorFamily::ALL {
            let micro = self.micro_step(family);
            if !micro.is_finite() || micro <= 0.0 {
                return Err(BenchError::invalid_config(format!(
                    "{family} ground-truth micro step must be positive, got {micro}"
                )));
            }
        }
        Ok(())
    }
}

/// Settings of one experiment session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Robot, motion, and control time step.
    pub identity: ExperimentIdentity,
    /// Number of control steps per run.
    pub horizon: usize,
    /// Frames registered as contact points, in order.
    #[serde(default)]
    pub contact_frames: Vec<String>,
    /// Contact stiffness, damping, and friction.
    #[serde(default)]
    pub contact: ContactParams,
    /// Time the controller holds the initial state before its motion (seconds).
    #[serde(default)]
    pub pre_roll: f64,
    /// Whether contact points may only push.
    #[serde(default = "default_unilateral")]
    pub unilateral: bool,
    /// State vector errors are measured on.
    #[serde(default)]
    pub metric_target: MetricTarget,
    /// Ground-truth resolution.
    #[serde(default)]
    pub ground_truth: GroundTruthPolicy,
}

fn default_unilateral() -> bool {
    true
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::new(ExperimentIdentity::new("point-quadruped", "stand", 0.01), 100).with_contact_frames([
            "BL_contact",
            "BR_contact",
            "FL_contact",
            "FR_contact",
        ])
    }
}

impl ExperimentConfig {
    /// Create a config with no contact frames and default knobs.
    #[must_use]
    pub fn new(identity: ExperimentIdentity, horizon: usize) -> Self {
        Self {
            identity,
            horizon,
            contact_frames: Vec::new(),
            contact: ContactParams::default(),
            pre_roll: 0.0,
            unilateral: true,
            metric_target: MetricTarget::default(),
            ground_truth: GroundTruthPolicy::default(),
        }
    }

    /// Set the contact frames.
    #[must_use]
    pub fn with_contact_frames<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contact_frames = frames.into_iter().map(Into::into).collect();
        self
    }

    /// Set the contact parameters.
    #[must_use]
    pub fn with_contact(mut self, contact: ContactParams) -> Self {
        self.contact = contact;
        self
    }

    /// Set the controller pre-roll (seconds).
    #[must_use]
    pub fn with_pre_roll(mut self, pre_roll: f64) -> Self {
        self.pre_roll = pre_roll;
        self
    }

    /// Set whether contacts are unilateral.
    #[must_use]
    pub fn with_unilateral(mut self, unilateral: bool) -> Self {
        self.unilateral = unilateral;
        self
    }

    /// Set the metric target.
    #[must_use]
    pub fn with_metric_target(mut self, target: MetricTarget) -> Self {
        self.metric_target = target;
        self
    }

    /// Set the ground-truth policy.
    #[must_use]
    pub fn with_ground_truth(mut self, policy: GroundTruthPolicy) -> Self {
        self.ground_truth = policy;
        self
    }

    /// Control time step (seconds).
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.identity.dt
    }

    /// Simulated duration of one run (seconds).
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Horizons are far below 2^52
    pub fn duration(&self) -> f64 {
        self.horizon as f64 * self.identity.dt
    }

    /// Validate the config.
    pub fn validate(&self) -> Result<()> {
        let dt = self.identity.dt;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(BenchError::invalid_config(format!(
                "invalid timestep: {dt} (must be positive and finite)"
            )));
        }
        if self.horizon == 0 {
            return Err(BenchError::invalid_config(
                "horizon must cover at least one control step",
            ));
        }
        if self.identity.robot.is_empty() || self.identity.motion.is_empty() {
            return Err(BenchError::invalid_config(
                "robot and motion names must not be empty",
            ));
        }
        if !self.pre_roll.is_finite() || self.pre_roll < 0.0 {
            return Err(BenchError::invalid_config(format!(
                "pre-roll must be non-negative, got {}",
                self.pre_roll
            )));
        }
        self.contact.validate()?;
        self.ground_truth.validate()
    }
}
