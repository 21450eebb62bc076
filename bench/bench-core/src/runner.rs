//! Execution of one configuration.
//!
//! [`SimulationRunner::run`] builds a simulator for a [`Configuration`],
//! registers the contact frames, and steps the controller/simulator loop for
//! the configured horizon, recording every sample into a
//! [`TrajectoryBuffer`].
//!
//! # Local-Error Mode
//!
//! When a reference trajectory is supplied, the simulator is put back on the
//! reference before the control of every step. Contact anchors are hidden
//! state that a single state reset would discard, so the reset is always the
//! same three calls:
//!
//! 1. `reset_state(q_ref[i], v_ref[i], true)` marks the active contacts
//! 2. `reset_anchor_point` restores each anchor and slipping flag
//! 3. `reset_state(q_ref[i], v_ref[i], false)` recomputes contact forces from
//!    the restored anchors
//!
//! # Divergence
//!
//! A non-finite velocity, or one whose 2-norm exceeds [`DIVERGENCE_BOUND`],
//! stops the run in the step that produced it. The samples recorded so far are
//! kept and returned with the [`BenchError::DivergedSimulation`] failure.

use std::time::{Duration, Instant};

use bench_engine::{Controller, RobotModel, SimulationEngine, Simulator};
use bench_types::{
    BenchError, ContactHandle, Configuration, DVector, FrameId, IntegratorSettings, Result,
    SimulatorParams,
};
use tracing::{debug, info, warn};

use crate::config::ExperimentConfig;
use crate::trajectory::{RunStatus, RunTiming, Trajectory, TrajectoryBuffer};

/// Velocity 2-norm above which a run is considered diverged.
pub const DIVERGENCE_BOUND: f64 = 1e6;

/// Initial configuration and velocity of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialState {
    /// Generalized configuration.
    pub q: DVector<f64>,
    /// Generalized velocity.
    pub v: DVector<f64>,
}

impl InitialState {
    /// Create an initial state.
    #[must_use]
    pub fn new(q: DVector<f64>, v: DVector<f64>) -> Self {
        Self { q, v }
    }

    /// Zero configuration and velocity for a model.
    #[must_use]
    pub fn zeros<M: RobotModel>(model: &M) -> Self {
        Self::new(DVector::zeros(model.nq()), DVector::zeros(model.nv()))
    }
}

/// Result of one run: the trajectory, plus the failure that stopped it early.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Recorded samples (partially filled if the run diverged).
    pub trajectory: Trajectory,
    /// Why the run stopped early, if it did.
    pub failure: Option<BenchError>,
}

impl RunOutcome {
    /// Whether the run diverged.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        self.trajectory.is_diverged()
    }

    /// The trajectory if the run completed, the failure otherwise.
    pub fn into_result(self) -> Result<Trajectory> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.trajectory),
        }
    }
}

/// Runs configurations against an engine and model.
pub struct SimulationRunner<'a, E: SimulationEngine> {
    engine: &'a E,
    model: &'a E::Model,
    config: &'a ExperimentConfig,
}

impl<'a, E: SimulationEngine> Clone for SimulationRunner<'a, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, E: SimulationEngine> Copy for SimulationRunner<'a, E> {}

impl<'a, E: SimulationEngine> SimulationRunner<'a, E> {
    /// Create a runner.
    #[must_use]
    pub fn new(engine: &'a E, model: &'a E::Model, config: &'a ExperimentConfig) -> Self {
        Self {
            engine,
            model,
            config,
        }
    }

    /// Experiment settings used by this runner.
    #[must_use]
    pub fn config(&self) -> &'a ExperimentConfig {
        self.config
    }

    /// Robot model used by this runner.
    #[must_use]
    pub fn model(&self) -> &'a E::Model {
        self.model
    }

    /// Run one configuration.
    ///
    /// With a `reference`, the run is in local-error mode (see the module
    /// docs). Divergence is reported through [`RunOutcome::failure`]; every
    /// other failure is returned as an error.
    ///
    /// # Errors
    ///
    /// - [`BenchError::ContactFrameNotFound`] for an unknown contact frame,
    ///   before any stepping
    /// - [`BenchError::InvalidConfig`] for invalid settings, a mis-sized
    ///   initial state, or a reference that does not cover the horizon
    /// - [`BenchError::Engine`] if the engine fails to build or step
    pub fn run<C>(
        &self,
        controller: &mut C,
        initial: &InitialState,
        configuration: &Configuration,
        reference: Option<&Trajectory>,
    ) -> Result<RunOutcome>
    where
        C: Controller + ?Sized,
    {
        let config = self.config;
        config.validate()?;
        configuration.validate()?;
        self.check_initial_state(initial)?;
        let frames = self.resolve_frames()?;
        if let Some(reference) = reference {
            self.check_reference(reference, frames.len())?;
        }

        let dt = config.dt();
        let horizon = config.horizon;
        let params = SimulatorParams::new(dt, configuration.ndt(), config.contact);
        let mut sim = match configuration.settings() {
            IntegratorSettings::Exponential(settings) => {
                self.engine.build_exponential(self.model, &params, settings)?
            }
            IntegratorSettings::Euler(settings) => {
                self.engine.build_euler(self.model, &params, settings)?
            }
        };
        let handles: Vec<ContactHandle> = frames
            .iter()
            .map(|(name, id)| sim.add_contact_point(name, *id, config.unilateral))
            .collect();

        info!(
            configuration = configuration.name(),
            ndt = configuration.ndt(),
            horizon,
            local_error = reference.is_some(),
            "starting run"
        );

        let mut buffer = TrajectoryBuffer::new(
            configuration.clone(),
            dt,
            horizon,
            self.model.nq(),
            self.model.nv(),
            &config.contact_frames,
        );

        sim.reset_state(&initial.q, &initial.v, true)?;
        controller.reset(&initial.q, &initial.v, config.pre_roll);
        record_sample(&mut buffer, &sim, &handles, 0);

        let mut status = RunStatus::Completed;
        let mut failure = None;
        let mut step_time = Duration::ZERO;
        let loop_start = Instant::now();

        for i in 0..horizon {
            if let Some(reference) = reference {
                reset_to_reference(&mut sim, &handles, reference, i)?;
            }

            let u = controller.compute_control(sim.q(), sim.v());
            let start = Instant::now();
            sim.step(&u)?;
            step_time += start.elapsed();

            buffer.record_control(i, &u);
            if let Some(diag) = sim.exponential_diagnostics() {
                buffer.record_diagnostics(i, diag);
            }
            record_sample(&mut buffer, &sim, &handles, i + 1);

            let v = sim.v();
            let norm = v.norm();
            if v.iter().any(|x| !x.is_finite()) || norm > DIVERGENCE_BOUND {
                warn!(
                    configuration = configuration.name(),
                    step = i + 1,
                    velocity_norm = norm,
                    "simulation diverged"
                );
                status = RunStatus::Diverged { step: i + 1 };
                failure = Some(BenchError::diverged(i + 1, norm));
                break;
            }
        }

        let wall_clock = loop_start.elapsed().as_secs_f64();
        let mean_step_time = if status.is_diverged() {
            f64::NAN
        } else {
            #[allow(clippy::cast_precision_loss)] // Horizons are far below 2^52
            let n = horizon as f64;
            step_time.as_secs_f64() / n
        };
        debug!(
            configuration = configuration.name(),
            mean_step_time,
            wall_clock,
            "run finished"
        );

        Ok(RunOutcome {
            trajectory: buffer.finish(
                status,
                RunTiming {
                    mean_step_time,
                    wall_clock,
                },
            ),
            failure,
        })
    }

    fn resolve_frames(&self) -> Result<Vec<(&'a str, FrameId)>> {
        self.config
            .contact_frames
            .iter()
            .map(|name| {
                self.model
                    .frame_id(name)
                    .map(|id| (name.as_str(), id))
                    .ok_or_else(|| BenchError::frame_not_found(name.as_str()))
            })
            .collect()
    }

    fn check_initial_state(&self, initial: &InitialState) -> Result<()> {
        let (nq, nv) = (self.model.nq(), self.model.nv());
        if initial.q.len() != nq || initial.v.len() != nv {
            return Err(BenchError::invalid_config(format!(
                "initial state has sizes ({}, {}), model {} expects ({nq}, {nv})",
                initial.q.len(),
                initial.v.len(),
                self.model.name()
            )));
        }
        Ok(())
    }

    fn check_reference(&self, reference: &Trajectory, contacts: usize) -> Result<()> {
        let name = reference.configuration().name();
        if reference.is_diverged() {
            return Err(BenchError::invalid_config(format!(
                "reference {name} diverged"
            )));
        }
        if reference.horizon() < self.config.horizon {
            return Err(BenchError::invalid_config(format!(
                "reference {name} covers {} steps, horizon is {}",
                reference.horizon(),
                self.config.horizon
            )));
        }
        if reference.contacts().contact_count() != contacts {
            return Err(BenchError::invalid_config(format!(
                "reference {name} has {} contact points, expected {contacts}",
                reference.contacts().contact_count()
            )));
        }
        Ok(())
    }
}

/// Overwrite the simulator state with reference sample `step`.
fn reset_to_reference<S: Simulator>(
    sim: &mut S,
    handles: &[ContactHandle],
    reference: &Trajectory,
    step: usize,
) -> Result<()> {
    let q = &reference.q()[step];
    let v = &reference.v()[step];
    sim.reset_state(q, v, true)?;
    for (index, handle) in handles.iter().enumerate() {
        if let Some(sample) = reference.contacts().get(index, step) {
            sim.reset_anchor_point(*handle, &sample.anchor, sample.slipping)?;
        }
    }
    sim.reset_state(q, v, false)
}

fn record_sample<S: Simulator>(
    buffer: &mut TrajectoryBuffer,
    sim: &S,
    handles: &[ContactHandle],
    step: usize,
) {
    buffer.record_state(step, sim.q(), sim.v());
    for (index, handle) in handles.iter().enumerate() {
        if let Some(sample) = sim.contact(*handle) {
            buffer.record_contact(index, step, sample);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use bench_engine::{PdController, PointMassEngine, PointMassModel};
    use bench_types::{ContactParams, EulerSettings, ExperimentIdentity, ExponentialSettings};

    fn setup() -> (PointMassModel, ExperimentConfig) {
        let model = PointMassModel::quadruped(1.0, 0.1, 0.1);
        let config = ExperimentConfig::new(ExperimentIdentity::new("point", "drop", 0.01), 20)
            .with_contact_frames(model.frame_names().collect::<Vec<_>>())
            .with_contact(ContactParams::soft());
        (model, config)
    }

    fn initial() -> InitialState {
        InitialState::new(DVector::from_vec(vec![0.0, 0.0, 0.02]), DVector::zeros(3))
    }

    fn controller(model: &PointMassModel) -> PdController {
        PdController::new(0.0, 0.0, 0.01, model.gravity_compensation() * 0.5)
    }

    #[test]
    fn test_trajectory_length() {
        let (model, config) = setup();
        let runner = SimulationRunner::new(&PointMassEngine, &model, &config);
        let configuration = Configuration::euler(2, EulerSettings::default()).unwrap();
        let outcome = runner
            .run(&mut controller(&model), &initial(), &configuration, None)
            .unwrap();
        assert!(outcome.failure.is_none());
        let traj = outcome.trajectory;
        assert_eq!(traj.len(), config.horizon + 1);
        assert_eq!(traj.q()[0], initial().q);
        assert_eq!(traj.contacts().contact_count(), 4);
        assert!(traj.timing().mean_step_time.is_finite());
        assert!(traj.timing().wall_clock >= 0.0);
        // Dropped from 2 cm: the feet touch down within the horizon
        assert!(traj.contacts().active_count(config.horizon) > 0);
    }

    #[test]
    fn test_exponential_records_diagnostics() {
        let (model, config) = setup();
        let runner = SimulationRunner::new(&PointMassEngine, &model, &config);
        let configuration =
            Configuration::exponential(1, ExponentialSettings::default()).unwrap();
        let traj = runner
            .run(&mut controller(&model), &initial(), &configuration, None)
            .unwrap()
            .into_result()
            .unwrap();
        let diag = traj.diagnostics().unwrap();
        assert!(diag.matrix_norm[0] > 0.0);
        assert_eq!(diag.matrix_norm[config.horizon], 0.0);
    }

    #[test]
    fn test_unknown_frame_fails_before_stepping() {
        let (model, config) = setup();
        let config = config.with_contact_frames(["FL_contact", "tail"]);
        let runner = SimulationRunner::new(&PointMassEngine, &model, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let err = runner
            .run(&mut controller(&model), &initial(), &configuration, None)
            .unwrap_err();
        assert_eq!(err, BenchError::frame_not_found("tail"));
    }

    #[test]
    fn test_initial_state_size_checked() {
        let (model, config) = setup();
        let runner = SimulationRunner::new(&PointMassEngine, &model, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let bad = InitialState::new(DVector::zeros(7), DVector::zeros(6));
        assert!(runner
            .run(&mut controller(&model), &bad, &configuration, None)
            .unwrap_err()
            .is_config_error());
    }

    #[test]
    fn test_short_reference_rejected() {
        let (model, config) = setup();
        let short = ExperimentConfig {
            horizon: 5,
            ..config.clone()
        };
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let reference = SimulationRunner::new(&PointMassEngine, &model, &short)
            .run(&mut controller(&model), &initial(), &configuration, None)
            .unwrap()
            .trajectory;

        let runner = SimulationRunner::new(&PointMassEngine, &model, &config);
        let err = runner
            .run(&mut controller(&model), &initial(), &configuration, Some(&reference))
            .unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig { .. }));
    }

    #[test]
    fn test_local_error_mode_against_itself_is_exact() {
        // Resetting onto a run of the same configuration reproduces it
        let (model, config) = setup();
        let runner = SimulationRunner::new(&PointMassEngine, &model, &config);
        let configuration = Configuration::euler(4, EulerSettings::default()).unwrap();
        let reference = runner
            .run(&mut controller(&model), &initial(), &configuration, None)
            .unwrap()
            .trajectory;
        let replay = runner
            .run(&mut controller(&model), &initial(), &configuration, Some(&reference))
            .unwrap()
            .trajectory;
        assert_eq!(replay.q(), reference.q());
        assert_eq!(replay.v(), reference.v());
    }
}
