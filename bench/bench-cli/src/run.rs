//! The `run` command: one session on the point-mass engine.

use std::path::Path;

use anyhow::{Context, Result};
use bench_core::{ExperimentSession, SweepBounds};
use bench_engine::PointMassEngine;
use bench_types::IntegratorFamily;
use owo_colors::OwoColorize;
use tracing::info;

use crate::config::RunConfig;
use crate::summary;

pub fn run(
    config: &RunConfig,
    cache_dir: &Path,
    output: &Path,
    euler_only: bool,
    exponential_only: bool,
) -> Result<()> {
    let experiment = &config.experiment;
    let mut bounds = match &config.sweep {
        Some(bounds) => bounds.clone(),
        None => {
            let ndt = experiment
                .ground_truth
                .ndt_for(experiment.dt(), IntegratorFamily::Exponential)?;
            SweepBounds::relative_to_ground_truth(ndt)
        }
    };
    if euler_only {
        bounds = bounds.euler_only();
    }
    if exponential_only {
        bounds = bounds.exponential_only();
    }

    let model = config.model();
    println!("{}", format!("Benchmark {}", experiment.identity).bold());
    println!(
        "  horizon {} steps ({:.2} s), {} contact points",
        experiment.horizon,
        experiment.duration(),
        experiment.contact_frames.len()
    );

    let session = ExperimentSession::new(
        &PointMassEngine,
        &model,
        experiment.clone(),
        config.initial_state(),
    )
    .with_cache_dir(cache_dir);
    let report = session
        .run(&bounds, || config.controller(&model))
        .context("Benchmark session failed")?;

    report
        .store
        .save(output)
        .with_context(|| format!("Failed to save results to {}", output.display()))?;
    info!(path = %output.display(), results = report.store.len(), "saved results");

    println!();
    summary::print(&report.summary, None);

    let diverged: Vec<&str> = report.diverged().collect();
    if diverged.is_empty() {
        println!("{}", "✓ No configuration diverged".green());
    } else {
        println!(
            "{}",
            format!("✗ {} configurations diverged", diverged.len()).red()
        );
    }
    println!("Results written to {}", output.display());
    Ok(())
}
