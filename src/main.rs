//! Productivity Predictor - Main Entry Point
//!
//! Cleans activity logs, trains the task-type classifier and serves
//! single predictions from the command line.

use clap::Parser;
use productivity_predictor::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "productivity_predictor=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
