//! Error metrics of a run against its ground truth.
//!
//! Comparisons are step-aligned at control-step granularity: sample `i` of
//! the run is compared with sample `i` of the ground truth, whatever either
//! trajectory's sub-step count. Aggregates cover steps `1..=N`; step 0 is the
//! shared initial state.

use bench_types::{BenchError, DVector, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::MetricTarget;
use crate::trajectory::Trajectory;

/// Error and performance metrics of one run.
///
/// Every scalar and every per-step entry is `NaN` for a diverged run and
/// non-negative otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// Per-step 2-norm of the error.
    pub err_2norm: Vec<f64>,
    /// Per-step inf-norm of the error.
    pub err_infnorm: Vec<f64>,
    /// Mean of the per-step 2-norm.
    pub mean_2norm: f64,
    /// Max of the per-step 2-norm.
    pub max_2norm: f64,
    /// Mean of the per-step inf-norm.
    pub mean_infnorm: f64,
    /// Max of the per-step inf-norm.
    pub max_infnorm: f64,
    /// Mean computation time per step (seconds).
    pub mean_step_time: f64,
    /// Simulated time over wall-clock time.
    pub realtime_factor: f64,
    /// Sub-steps per control step.
    pub ndt: u32,
    /// Sub-step duration (seconds).
    pub sub_dt: f64,
    /// Mean matrix multiplications per step, for exponential runs.
    pub mean_matrix_multiplications: Option<f64>,
    /// Mean matrix exponential 1-norm, for exponential runs.
    pub mean_matrix_norm: Option<f64>,
    /// Whether the run diverged.
    pub diverged: bool,
}

impl ErrorMetrics {
    /// Number of compared samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.err_infnorm.len()
    }

    /// Whether no samples were compared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.err_infnorm.is_empty()
    }
}

/// Computes [`ErrorMetrics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorAnalyzer {
    target: MetricTarget,
}

impl ErrorAnalyzer {
    /// Create an analyzer comparing the given state vector.
    #[must_use]
    pub fn new(target: MetricTarget) -> Self {
        Self { target }
    }

    /// Compared state vector.
    #[must_use]
    pub fn target(&self) -> MetricTarget {
        self.target
    }

    /// Compare a run with its ground truth.
    ///
    /// Trajectories of different lengths are compared over their common
    /// prefix, with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::ConfigurationMismatch`] if the compared state
    /// vectors have different sizes.
    pub fn analyze(&self, run: &Trajectory, ground_truth: &Trajectory) -> Result<ErrorMetrics> {
        let configuration = run.configuration();
        let (run_states, truth_states) = match self.target {
            MetricTarget::Velocity => (run.v(), ground_truth.v()),
            MetricTarget::Configuration => (run.q(), ground_truth.q()),
        };

        let len = run_states.len().min(truth_states.len());
        if run_states.len() != truth_states.len() {
            warn!(
                configuration = configuration.name(),
                run = run_states.len(),
                ground_truth = truth_states.len(),
                "trajectory lengths differ, comparing the common prefix"
            );
        }
        if let (Some(a), Some(b)) = (run_states.first(), truth_states.first()) {
            if a.len() != b.len() {
                return Err(BenchError::mismatch(
                    format!("{}-dimensional state", b.len()),
                    format!("{}-dimensional state in {}", a.len(), configuration.name()),
                ));
            }
        }

        let diverged = run.is_diverged();
        let (err_2norm, err_infnorm): (Vec<f64>, Vec<f64>) = if diverged {
            (vec![f64::NAN; len], vec![f64::NAN; len])
        } else {
            run_states[..len]
                .iter()
                .zip(&truth_states[..len])
                .map(|(x, x_ref)| {
                    let e: DVector<f64> = x - x_ref;
                    (e.norm(), e.amax())
                })
                .unzip()
        };

        let steps = len.saturating_sub(1);
        let aggregate = |values: &[f64], f: fn(&[f64]) -> f64| {
            if diverged {
                f64::NAN
            } else {
                f(values.get(1..).unwrap_or_default())
            }
        };
        let mean_2norm = aggregate(&err_2norm, mean);
        let max_2norm = aggregate(&err_2norm, max);
        let mean_infnorm = aggregate(&err_infnorm, mean);
        let max_infnorm = aggregate(&err_infnorm, max);

        let timing = run.timing();
        let (mean_step_time, realtime_factor) = if diverged {
            (f64::NAN, f64::NAN)
        } else {
            #[allow(clippy::cast_precision_loss)] // Horizons are far below 2^52
            let simulated = steps as f64 * run.dt();
            (timing.mean_step_time, simulated / timing.wall_clock)
        };

        let (mean_matrix_multiplications, mean_matrix_norm) = match run.diagnostics() {
            Some(_) if diverged => (Some(f64::NAN), Some(f64::NAN)),
            Some(diag) => {
                let n = steps.min(diag.matrix_multiplications.len());
                let mults: Vec<f64> = diag.matrix_multiplications[..n]
                    .iter()
                    .map(|&m| f64::from(m))
                    .collect();
                let norms = &diag.matrix_norm[..steps.min(diag.matrix_norm.len())];
                (Some(mean(&mults)), Some(mean(norms)))
            }
            None => (None, None),
        };

        Ok(ErrorMetrics {
            err_2norm,
            err_infnorm,
            mean_2norm,
            max_2norm,
            mean_infnorm,
            max_infnorm,
            mean_step_time,
            realtime_factor,
            ndt: configuration.ndt(),
            sub_dt: configuration.sub_step(run.dt()),
            mean_matrix_multiplications,
            mean_matrix_norm,
            diverged,
        })
    }
}

/// Mean of a slice; `0` when empty.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// Max of a slice; `0` when empty.
fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}
