//! Ground-truth trajectories, built once and cached on disk.
//!
//! Each integrator family has its own ground truth, run without a reference at
//! `ndt = 2^k` sub-steps (see [`GroundTruthPolicy::ndt_for`]). Records are
//! stored as bundles named after their [`GroundTruthKey`] and must match the
//! requested identity exactly when loaded.
//!
//! [`GroundTruthPolicy::ndt_for`]: crate::GroundTruthPolicy::ndt_for

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bench_engine::{Controller, SimulationEngine};
use bench_types::{BenchError, Configuration, GroundTruthKey, IntegratorFamily, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bundle::{self, BundleKind};
use crate::runner::{InitialState, SimulationRunner};
use crate::trajectory::Trajectory;

/// What a cached record must match to be reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RecordIdentity {
    key: GroundTruthKey,
    horizon: usize,
    ndt: u32,
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (N={}, ndt={})", self.key, self.horizon, self.ndt)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GroundTruthRecord {
    identity: RecordIdentity,
    trajectory: Trajectory,
}

/// Builds, loads, and memoizes the ground truth of each family.
pub struct GroundTruthManager<'a, E: SimulationEngine> {
    runner: SimulationRunner<'a, E>,
    initial: InitialState,
    cache_dir: Option<PathBuf>,
    memo: BTreeMap<IntegratorFamily, Trajectory>,
}

impl<'a, E: SimulationEngine> GroundTruthManager<'a, E> {
    /// Create a manager without a disk cache.
    #[must_use]
    pub fn new(runner: SimulationRunner<'a, E>, initial: InitialState) -> Self {
        Self {
            runner,
            initial,
            cache_dir: None,
            memo: BTreeMap::new(),
        }
    }

    /// Persist and reuse records in a directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Cache directory, if any.
    #[must_use]
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Key of a family's ground truth.
    #[must_use]
    pub fn key(&self, family: IntegratorFamily) -> GroundTruthKey {
        self.runner.config().identity.ground_truth_key(family)
    }

    /// Path of a family's cached record, if caching is enabled.
    #[must_use]
    pub fn cache_path(&self, family: IntegratorFamily) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(self.key(family).file_name()))
    }

    /// Ground truth of a family: memoized, else loaded, else built.
    ///
    /// The controller is only used when the trajectory has to be built.
    ///
    /// # Errors
    ///
    /// - [`BenchError::ConfigurationMismatch`] if the cached record was written
    ///   for another identity, horizon, or sub-step count
    /// - [`BenchError::DivergedSimulation`] if the ground truth diverges
    /// - any error of [`SimulationRunner::run`] or of reading/writing the cache
    pub fn get_or_build<C>(
        &mut self,
        family: IntegratorFamily,
        controller: &mut C,
    ) -> Result<&Trajectory>
    where
        C: Controller + ?Sized,
    {
        if !self.memo.contains_key(&family) {
            let trajectory = self.load_or_build(family, controller)?;
            self.memo.insert(family, trajectory);
        }
        self.memo
            .get(&family)
            .ok_or_else(|| BenchError::engine(format!("{family} ground truth missing")))
    }

    fn identity(&self, family: IntegratorFamily) -> Result<RecordIdentity> {
        let config = self.runner.config();
        Ok(RecordIdentity {
            key: self.key(family),
            horizon: config.horizon,
            ndt: config.ground_truth.ndt_for(config.dt(), family)?,
        })
    }

    fn load_or_build<C>(&self, family: IntegratorFamily, controller: &mut C) -> Result<Trajectory>
    where
        C: Controller + ?Sized,
    {
        let identity = self.identity(family)?;
        let path = self.cache_path(family);

        if let Some(path) = path.as_deref().filter(|p| p.exists()) {
            let record: GroundTruthRecord = bundle::read_bundle_file(path, BundleKind::GroundTruth)?;
            if record.identity != identity {
                return Err(BenchError::mismatch(&identity, &record.identity));
            }
            info!(key = %identity.key, path = %path.display(), "loaded ground truth");
            return Ok(record.trajectory);
        }

        info!(key = %identity.key, ndt = identity.ndt, "building ground truth");
        let configuration = Configuration::ground_truth(family, identity.ndt)?;
        let trajectory = self
            .runner
            .run(controller, &self.initial, &configuration, None)?
            .into_result()?;

        if let Some(path) = path {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let record = GroundTruthRecord {
                identity,
                trajectory,
            };
            bundle::write_bundle_file(&path, BundleKind::GroundTruth, &record)?;
            debug!(path = %path.display(), "cached ground truth");
            return Ok(record.trajectory);
        }
        Ok(trajectory)
    }
}
