//! rugby-pipeline
//!
//! CLI for persisting scraped rugby records.

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is kept for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rugby_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Ingest {
            input,
            db,
            csv_dir,
            no_db,
            no_csv,
        } => cli::run_ingest(input, db, csv_dir, no_db, no_csv),
        Commands::InitDb { db } => cli::run_init_db(db),
        Commands::Stats { db } => cli::run_stats(db),
    }
}
