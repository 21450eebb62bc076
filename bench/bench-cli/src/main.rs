//! Contact integrator benchmark runner.
//!
//! # Commands
//!
//! - `contact-bench init <path>` - Write the default run config as JSON
//! - `contact-bench run` - Run a full session on the point-mass engine and
//!   save the result bundle
//! - `contact-bench summary <bundle>` - Print the summary tables of a saved
//!   bundle
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

mod config;
mod run;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Contact integrator benchmarks
///
/// Measures the one-step error and cost of every integrator configuration
/// of a sweep against a fine-step ground truth.
#[derive(Parser)]
#[command(name = "contact-bench")]
#[command(about = "Local-error benchmarks for contact integrators", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default run config
    Init {
        /// Destination of the JSON config
        #[arg(name = "PATH")]
        path: PathBuf,
    },

    /// Run a benchmark session and save its results
    Run {
        /// JSON run config (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory where ground truths are cached
        #[arg(long, default_value = "ground-truth")]
        cache_dir: PathBuf,

        /// Result bundle to write
        #[arg(long, short, default_value = "results.cbb")]
        output: PathBuf,

        /// Sweep Euler configurations only
        #[arg(long, conflicts_with = "exponential_only")]
        euler_only: bool,

        /// Sweep exponential configurations only
        #[arg(long)]
        exponential_only: bool,
    },

    /// Print the summary tables of a result bundle
    Summary {
        /// Result bundle to read
        #[arg(name = "BUNDLE")]
        bundle: PathBuf,

        /// Only print one method's series (e.g. "euler", "exp mmm   2")
        #[arg(long)]
        method: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => config::write_default(&path),
        Commands::Run {
            config,
            cache_dir,
            output,
            euler_only,
            exponential_only,
        } => {
            let config = config::load(config.as_deref())?;
            run::run(&config, &cache_dir, &output, euler_only, exponential_only)
        }
        Commands::Summary { bundle, method } => summary::run(&bundle, method.as_deref()),
    }
}
