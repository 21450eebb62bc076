//! The `summary` command and table printing.

use std::path::Path;

use anyhow::{bail, Context, Result};
use bench_core::{ResultStore, Summary};
use owo_colors::OwoColorize;

pub fn run(bundle: &Path, method: Option<&str>) -> Result<()> {
    let store = ResultStore::load(bundle)
        .with_context(|| format!("Failed to load results from {}", bundle.display()))?;
    let summary = Summary::from_store(&store);
    if summary.is_empty() {
        bail!("{} holds no analyzed results", bundle.display());
    }
    if let Some(method) = method {
        if summary.method(method).is_none() {
            let known: Vec<&str> = summary.series().iter().map(|s| s.method.as_str()).collect();
            bail!("no series named {method:?} (known: {})", known.join(", "));
        }
    }
    print(&summary, method);
    Ok(())
}

/// Print every series, or one, with diverged rows highlighted.
pub fn print(summary: &Summary, method: Option<&str>) {
    let header = format!(
        "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>8}",
        "name", "ndt", "dt [s]", "mean err", "max err", "step [us]", "RTF"
    );
    for series in summary.series() {
        if method.is_some_and(|m| m != series.method) {
            continue;
        }
        println!("{}", series.method.bold());
        println!("{}", header.dimmed());
        for row in &series.rows {
            if row.diverged {
                println!("{}", row.red());
            } else {
                println!("{row}");
            }
        }
        println!();
    }
}
