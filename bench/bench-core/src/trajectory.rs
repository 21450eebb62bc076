//! Recorded runs.
//!
//! A run writes into a [`TrajectoryBuffer`], whose storage is allocated for
//! the whole horizon up front, and seals it into an immutable [`Trajectory`].
//!
//! # Indexing
//!
//! A run of `N` control steps has `N + 1` samples. Sample `0` is the initial
//! state; sample `i + 1` is the state after control step `i`. The control
//! `u[i]` and the exponential diagnostics at `i` belong to the transition
//! from sample `i` to sample `i + 1`, so their slot `N` stays zero.

use bench_types::{
    Configuration, ContactPointSample, DVector, ExponentialDiagnostics, IntegratorFamily,
};
use serde::{Deserialize, Serialize};

use crate::contact::ContactPointSet;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    /// All steps were taken.
    Completed,
    /// The divergence guard tripped on this sample.
    Diverged {
        /// Index of the first offending sample.
        step: usize,
    },
}

impl RunStatus {
    /// Whether the run diverged.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

/// Wall-clock measurements of a run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunTiming {
    /// Mean duration of one `step()` call (seconds); `NaN` if diverged.
    pub mean_step_time: f64,
    /// Duration of the whole stepping loop (seconds).
    pub wall_clock: f64,
}

/// Per-step diagnostics of exponential-family runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticSeries {
    /// Matrix multiplications per control step.
    pub matrix_multiplications: Vec<u32>,
    /// Matrix exponential 1-norm per control step.
    pub matrix_norm: Vec<f64>,
}

impl DiagnosticSeries {
    fn zeros(len: usize) -> Self {
        Self {
            matrix_multiplications: vec![0; len],
            matrix_norm: vec![0.0; len],
        }
    }
}

/// A recorded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    configuration: Configuration,
    dt: f64,
    q: Vec<DVector<f64>>,
    v: Vec<DVector<f64>>,
    u: Vec<DVector<f64>>,
    contacts: ContactPointSet,
    diagnostics: Option<DiagnosticSeries>,
    status: RunStatus,
    timing: RunTiming,
}

impl Trajectory {
    /// Configuration that produced the run.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Control time step (seconds).
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of samples (`horizon + 1`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// Whether the trajectory holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Number of control steps.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.q.len().saturating_sub(1)
    }

    /// Configuration samples.
    #[must_use]
    pub fn q(&self) -> &[DVector<f64>] {
        &self.q
    }

    /// Velocity samples.
    #[must_use]
    pub fn v(&self) -> &[DVector<f64>] {
        &self.v
    }

    /// Control inputs.
    #[must_use]
    pub fn u(&self) -> &[DVector<f64>] {
        &self.u
    }

    /// Contact samples.
    #[must_use]
    pub fn contacts(&self) -> &ContactPointSet {
        &self.contacts
    }

    /// Exponential diagnostics, for exponential-family runs.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&DiagnosticSeries> {
        self.diagnostics.as_ref()
    }

    /// How the run ended.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Whether the run diverged.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        self.status.is_diverged()
    }

    /// Timing of the run.
    #[must_use]
    pub fn timing(&self) -> RunTiming {
        self.timing
    }
}

/// Pre-allocated storage filled by a run.
#[derive(Debug, Clone)]
pub struct TrajectoryBuffer {
    trajectory: Trajectory,
}

impl TrajectoryBuffer {
    /// Allocate `horizon + 1` zeroed samples.
    ///
    /// Diagnostics are allocated for exponential-family configurations only.
    #[must_use]
    pub fn new<S: AsRef<str>>(
        configuration: Configuration,
        dt: f64,
        horizon: usize,
        nq: usize,
        nv: usize,
        contact_frames: &[S],
    ) -> Self {
        let len = horizon + 1;
        let diagnostics = (configuration.family() == IntegratorFamily::Exponential)
            .then(|| DiagnosticSeries::zeros(len));
        Self {
            trajectory: Trajectory {
                configuration,
                dt,
                q: vec![DVector::zeros(nq); len],
                v: vec![DVector::zeros(nv); len],
                u: vec![DVector::zeros(nv); len],
                contacts: ContactPointSet::new(contact_frames, len),
                diagnostics,
                status: RunStatus::Completed,
                timing: RunTiming::default(),
            },
        }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    /// Whether the buffer holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    /// Store configuration and velocity of a sample.
    ///
    /// Out-of-range steps are ignored.
    pub fn record_state(&mut self, step: usize, q: &DVector<f64>, v: &DVector<f64>) {
        if let (Some(q_slot), Some(v_slot)) =
            (self.trajectory.q.get_mut(step), self.trajectory.v.get_mut(step))
        {
            q_slot.clone_from(q);
            v_slot.clone_from(v);
        }
    }

    /// Store the control applied at a step.
    pub fn record_control(&mut self, step: usize, u: &DVector<f64>) {
        if let Some(slot) = self.trajectory.u.get_mut(step) {
            slot.clone_from(u);
        }
    }

    /// Store one contact sample.
    pub fn record_contact(&mut self, contact: usize, step: usize, sample: ContactPointSample) {
        self.trajectory.contacts.record(contact, step, sample);
    }

    /// Store exponential diagnostics of a step. Ignored for Euler runs.
    pub fn record_diagnostics(&mut self, step: usize, diagnostics: ExponentialDiagnostics) {
        if let Some(series) = self.trajectory.diagnostics.as_mut() {
            if let (Some(mults), Some(norm)) = (
                series.matrix_multiplications.get_mut(step),
                series.matrix_norm.get_mut(step),
            ) {
                *mults = diagnostics.matrix_multiplications;
                *norm = diagnostics.matrix_norm;
            }
        }
    }

    /// Seal the run.
    #[must_use]
    pub fn finish(mut self, status: RunStatus, timing: RunTiming) -> Trajectory {
        self.trajectory.status = status;
        self.trajectory.timing = timing;
        self.trajectory
    }
}
