//! CLI commands for rugby-pipeline.
//!
//! Ingests a scraped record feed into the store and CSV exports, and
//! inspects the store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use rugby_pipeline::config::AppConfig;
use rugby_pipeline::{FlatFileSink, PipelineRunner, RelationalSink};

#[derive(Parser)]
#[command(name = "rugby-pipeline")]
#[command(version, about = "Persist scraped rugby records to SQLite and CSV", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read a JSON-lines record feed and run it through the sinks
    Ingest {
        /// Record feed, one JSON object per line (stdin when omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// SQLite database path override
        #[arg(long)]
        db: Option<PathBuf>,

        /// CSV output directory override
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Skip the relational sink
        #[arg(long)]
        no_db: bool,

        /// Skip the CSV sink
        #[arg(long)]
        no_csv: bool,
    },

    /// Create the database schema and exit
    InitDb {
        /// SQLite database path override
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print row counts per table
    Stats {
        /// SQLite database path override
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Load configuration, applying a database path override
fn load_config(db: Option<PathBuf>) -> Result<AppConfig> {
    let mut config = AppConfig::load()?;
    if let Some(path) = db {
        config.storage.db_path = path;
    }
    Ok(config)
}

/// Run the ingest command.
pub fn run_ingest(
    input: Option<PathBuf>,
    db: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    no_db: bool,
    no_csv: bool,
) -> Result<()> {
    let mut config = load_config(db)?;
    if let Some(dir) = csv_dir {
        config.export.output_dir = dir;
    }
    if no_db {
        config.storage.enabled = false;
    }
    if no_csv {
        config.export.enabled = false;
    }

    let mut runner = PipelineRunner::new();
    if config.storage.enabled {
        tracing::info!("Database path: {}", config.storage.db_path.display());
        runner = runner.with_stage(Box::new(RelationalSink::new(&config.storage)?));
    }
    if config.export.enabled {
        tracing::info!("CSV directory: {}", config.export.output_dir.display());
        runner = runner.with_stage(Box::new(FlatFileSink::new(&config.export)));
    }
    if runner.is_empty() {
        anyhow::bail!("Both sinks are disabled, nothing to do");
    }

    let reader: Box<dyn BufRead> = match input {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let summary = runner.run(reader)?;

    println!("Sinks:     {}", runner.stage_names().join(", "));
    println!("Lines:     {}", summary.lines);
    println!("Records:   {}", summary.records);
    println!("Skipped:   {}", summary.skipped);
    println!("Malformed: {}", summary.malformed);
    println!("Failed:    {}", summary.failed);

    Ok(())
}

/// Run the init-db command.
pub fn run_init_db(db: Option<PathBuf>) -> Result<()> {
    let config = load_config(db)?;
    RelationalSink::new(&config.storage)?;
    println!("Schema ready at {}", config.storage.db_path.display());
    Ok(())
}

/// Run the stats command.
pub fn run_stats(db: Option<PathBuf>) -> Result<()> {
    let config = load_config(db)?;
    let sink = RelationalSink::new(&config.storage)?;

    println!("Database: {}", config.storage.db_path.display());
    for (kind, count) in sink.row_counts()? {
        println!("  {:<18} {:>8}", kind.name(), count);
    }
    Ok(())
}
