//! A complete benchmark session.
//!
//! [`ExperimentSession::run`] chains the components together:
//!
//! 1. build or load the ground truth of each family and store it under
//!    `ground-truth-exp` / `ground-truth-euler`
//! 2. generate the sweep
//! 3. run every configuration in local-error mode against its family's
//!    ground truth
//! 4. analyze every run and store it with its metrics, diverged runs included
//! 5. summarize
//!
//! Divergence is recorded and the sweep moves on; any other error stops the
//! session. With the `parallel` feature the runs of step 3 execute on the
//! rayon thread pool, each with its own simulator and controller; results are
//! still stored in schedule order.

use std::path::PathBuf;

use bench_engine::{Controller, SimulationEngine};
use bench_types::{Configuration, IntegratorFamily, Result};
use tracing::{info, warn};

use crate::analysis::ErrorAnalyzer;
use crate::config::ExperimentConfig;
use crate::ground_truth::GroundTruthManager;
use crate::report::Summary;
use crate::runner::{InitialState, RunOutcome, SimulationRunner};
use crate::store::ResultStore;
use crate::sweep::{SweepBounds, SweepScheduler};
use crate::trajectory::Trajectory;

/// Output of a session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Ground truths and every swept run.
    pub store: ResultStore,
    /// Metrics grouped by method.
    pub summary: Summary,
}

impl SessionReport {
    /// Names of the runs that diverged.
    pub fn diverged(&self) -> impl Iterator<Item = &str> {
        self.summary
            .rows()
            .filter(|r| r.diverged)
            .map(|r| r.name.as_str())
    }
}

/// One robot/motion/time-step experiment.
pub struct ExperimentSession<'a, E: SimulationEngine> {
    engine: &'a E,
    model: &'a E::Model,
    config: ExperimentConfig,
    initial: InitialState,
    cache_dir: Option<PathBuf>,
}

impl<'a, E> ExperimentSession<'a, E>
where
    E: SimulationEngine + Sync,
    E::Model: Sync,
{
    /// Create a session.
    #[must_use]
    pub fn new(
        engine: &'a E,
        model: &'a E::Model,
        config: ExperimentConfig,
        initial: InitialState,
    ) -> Self {
        Self {
            engine,
            model,
            config,
            initial,
            cache_dir: None,
        }
    }

    /// Cache ground truths in a directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Experiment settings.
    #[must_use]
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run the session.
    ///
    /// `make_controller` is called once per run, so every run starts from a
    /// fresh controller.
    ///
    /// # Errors
    ///
    /// Any error except [`DivergedSimulation`](bench_types::BenchError::DivergedSimulation)
    /// of a swept run: invalid settings, unknown contact frames, ground-truth
    /// cache mismatches or divergence, engine failures, and IO errors.
    pub fn run<F, C>(&self, bounds: &SweepBounds, make_controller: F) -> Result<SessionReport>
    where
        F: Fn() -> C + Sync,
        C: Controller,
    {
        self.config.validate()?;
        let runner = SimulationRunner::new(self.engine, self.model, &self.config);

        let mut manager = GroundTruthManager::new(runner, self.initial.clone());
        if let Some(dir) = &self.cache_dir {
            manager = manager.with_cache_dir(dir.clone());
        }
        let truth_exp = manager
            .get_or_build(IntegratorFamily::Exponential, &mut make_controller())?
            .clone();
        let truth_euler = manager
            .get_or_build(IntegratorFamily::ExplicitEuler, &mut make_controller())?
            .clone();
        let reference = |family: IntegratorFamily| match family {
            IntegratorFamily::Exponential => &truth_exp,
            IntegratorFamily::ExplicitEuler => &truth_euler,
        };

        let configurations = SweepScheduler::generate(bounds)?;
        info!(
            experiment = %self.config.identity,
            configurations = configurations.len(),
            "running sweep"
        );

        let run_one = |configuration: &Configuration| -> Result<RunOutcome> {
            let mut controller = make_controller();
            runner.run(
                &mut controller,
                &self.initial,
                configuration,
                Some(reference(configuration.family())),
            )
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<RunOutcome> = {
            use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
            configurations.par_iter().map(run_one).collect::<Result<_>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<RunOutcome> = configurations
            .iter()
            .map(run_one)
            .collect::<Result<_>>()?;

        let analyzer = ErrorAnalyzer::new(self.config.metric_target);
        let mut analyzed = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if let Some(failure) = outcome.failure {
                if !failure.is_recoverable() {
                    return Err(failure);
                }
                warn!(
                    configuration = outcome.trajectory.configuration().name(),
                    %failure,
                    "recording diverged run"
                );
            }
            let truth = reference(outcome.trajectory.configuration().family());
            let metrics = analyzer.analyze(&outcome.trajectory, truth)?;
            analyzed.push((outcome.trajectory, metrics));
        }

        let mut store = ResultStore::new();
        store_ground_truth(&mut store, truth_exp.clone());
        store_ground_truth(&mut store, truth_euler.clone());
        for (trajectory, metrics) in analyzed {
            let name = trajectory.configuration().name().to_owned();
            store.put(name.clone(), trajectory);
            store.set_metrics(&name, metrics)?;
        }

        let summary = Summary::from_store(&store);
        info!(
            runs = summary.len(),
            diverged = summary.rows().filter(|r| r.diverged).count(),
            "sweep finished"
        );
        Ok(SessionReport { store, summary })
    }
}

fn store_ground_truth(store: &mut ResultStore, truth: Trajectory) {
    let name = truth.configuration().family().ground_truth_name();
    store.put(name, truth);
}
