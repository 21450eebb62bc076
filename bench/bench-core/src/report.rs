//! Summary tables grouped into per-method series.

use std::fmt;

use bench_types::IntegratorFamily;
use serde::{Deserialize, Serialize};

use crate::store::ResultStore;

/// One analyzed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Configuration name.
    pub name: String,
    /// Series name.
    pub method: String,
    /// Integrator family.
    pub family: IntegratorFamily,
    /// Sub-steps per control step.
    pub ndt: u32,
    /// Sub-step duration (seconds).
    pub sub_dt: f64,
    /// Mean inf-norm error.
    pub mean_error: f64,
    /// Max inf-norm error.
    pub max_error: f64,
    /// Mean computation time per step (seconds).
    pub mean_step_time: f64,
    /// Real-time factor.
    pub realtime_factor: f64,
    /// Mean matrix multiplications per step (exponential only).
    pub mean_matrix_multiplications: Option<f64>,
    /// Mean matrix exponential 1-norm (exponential only).
    pub mean_matrix_norm: Option<f64>,
    /// Whether the run diverged.
    pub diverged: bool,
}

/// Rows sharing a method, ascending by `ndt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Method name.
    pub method: String,
    /// Rows of the series.
    pub rows: Vec<SummaryRow>,
}

impl Series {
    /// Sub-step counts, in row order.
    #[must_use]
    pub fn ndt(&self) -> Vec<u32> {
        self.rows.iter().map(|r| r.ndt).collect()
    }

    /// Mean inf-norm errors, in row order.
    #[must_use]
    pub fn mean_errors(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.mean_error).collect()
    }
}

/// Metrics of every analyzed result, grouped by method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    series: Vec<Series>,
}

impl Summary {
    /// Collect the analyzed entries of a store.
    ///
    /// Series appear in the order their first entry was stored; entries
    /// without metrics (the ground truths) are skipped.
    #[must_use]
    pub fn from_store(store: &ResultStore) -> Self {
        let mut series: Vec<Series> = Vec::new();
        for (name, entry) in store.iter() {
            let Some(metrics) = entry.metrics.as_ref() else {
                continue;
            };
            let configuration = entry.trajectory.configuration();
            let row = SummaryRow {
                name: name.to_owned(),
                method: configuration.method().to_owned(),
                family: configuration.family(),
                ndt: metrics.ndt,
                sub_dt: metrics.sub_dt,
                mean_error: metrics.mean_infnorm,
                max_error: metrics.max_infnorm,
                mean_step_time: metrics.mean_step_time,
                realtime_factor: metrics.realtime_factor,
                mean_matrix_multiplications: metrics.mean_matrix_multiplications,
                mean_matrix_norm: metrics.mean_matrix_norm,
                diverged: metrics.diverged,
            };
            match series.iter_mut().find(|s| s.method == row.method) {
                Some(existing) => existing.rows.push(row),
                None => series.push(Series {
                    method: row.method.clone(),
                    rows: vec![row],
                }),
            }
        }
        for s in &mut series {
            s.rows.sort_by_key(|r| r.ndt);
        }
        Self { series }
    }

    /// All series.
    #[must_use]
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Series of one method.
    #[must_use]
    pub fn method(&self, method: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.method == method)
    }

    /// All rows, series by series.
    pub fn rows(&self) -> impl Iterator<Item = &SummaryRow> {
        self.series.iter().flat_map(|s| s.rows.iter())
    }

    /// Row of one configuration.
    #[must_use]
    pub fn row(&self, name: &str) -> Option<&SummaryRow> {
        self.rows().find(|r| r.name == name)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.iter().map(|s| s.rows.len()).sum()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for SummaryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} {:>6} {:>10.3e} {:>10.3e} {:>10.3e} {:>10.3e} {:>8.2}",
            self.name,
            self.ndt,
            self.sub_dt,
            self.mean_error,
            self.max_error,
            self.mean_step_time * 1e6,
            self.realtime_factor,
        )?;
        if let Some(mults) = self.mean_matrix_multiplications {
            write!(f, " {mults:>6.1}")?;
        }
        if self.diverged {
            write!(f, " diverged")?;
        }
        Ok(())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for series in &self.series {
            writeln!(f, "{}", series.method)?;
            writeln!(
                f,
                "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>8}",
                "name", "ndt", "dt [s]", "mean err", "max err", "step [us]", "RTF"
            )?;
            for row in &series.rows {
                writeln!(f, "{row}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::analysis::ErrorAnalyzer;
    use crate::trajectory::{RunStatus, RunTiming, Trajectory, TrajectoryBuffer};
    use bench_types::{Configuration, DVector, EulerSettings, ExponentialSettings};

    fn trajectory(configuration: Configuration, value: f64, status: RunStatus) -> Trajectory {
        let mut buffer = TrajectoryBuffer::new(configuration, 0.01, 2, 1, 1, &["foot"]);
        let x = DVector::from_vec(vec![value]);
        buffer.record_state(1, &x, &x);
        buffer.record_state(2, &x, &x);
        buffer.finish(
            status,
            RunTiming {
                mean_step_time: 2e-6,
                wall_clock: 1e-3,
            },
        )
    }

    fn store() -> ResultStore {
        let truth = trajectory(
            Configuration::ground_truth(IntegratorFamily::ExplicitEuler, 64).unwrap(),
            1.0,
            RunStatus::Completed,
        );
        let mut store = ResultStore::new();
        store.put("ground-truth-euler", truth.clone());
        let runs = [
            (Configuration::euler(4, EulerSettings::default()).unwrap(), 1.1, RunStatus::Completed),
            (Configuration::euler(1, EulerSettings::default()).unwrap(), 1.5, RunStatus::Completed),
            (
                Configuration::exponential(1, ExponentialSettings::default()).unwrap(),
                0.0,
                RunStatus::Diverged { step: 1 },
            ),
        ];
        for (config, value, status) in runs {
            let name = config.name().to_owned();
            let run = trajectory(config, value, status);
            let metrics = ErrorAnalyzer::default().analyze(&run, &truth).unwrap();
            store.put(name.clone(), run);
            store.set_metrics(&name, metrics).unwrap();
        }
        store
    }

    #[test]
    fn test_grouping_and_order() {
        let summary = Summary::from_store(&store());
        assert_eq!(summary.len(), 3);
        assert_eq!(summary.series().len(), 2);
        assert!(summary.row("ground-truth-euler").is_none());

        let euler = summary.method("euler").unwrap();
        assert_eq!(euler.ndt(), vec![1, 4]);
        let errors = euler.mean_errors();
        assert!(errors[0] > errors[1]);
    }

    #[test]
    fn test_diverged_row() {
        let summary = Summary::from_store(&store());
        let row = summary.row("exp    1 mmm 100").unwrap();
        assert!(row.diverged);
        assert!(row.mean_error.is_nan());
        assert!(row.mean_matrix_multiplications.unwrap().is_nan());
    }

    #[test]
    fn test_display() {
        let text = Summary::from_store(&store()).to_string();
        assert!(text.contains("euler"));
        assert!(text.contains("mean err"));
        assert!(text.contains("diverged"));
        assert!(Summary::default().to_string().is_empty());
    }
}
