//! Host pipeline runner.
//!
//! Feeds decoded records, one at a time, through an ordered list of sinks.
//! Each sink sees the record returned by the previous one. Sinks are opened
//! before the first record and closed after end-of-stream.
//!
//! A sink error on one record is logged and drops that record from the
//! remaining sinks; the stream continues. Errors from `open` and `close`
//! end the run.

use anyhow::{Context, Result};
use std::io::BufRead;
use tracing::{debug, error, info};

use crate::feed::decode_line;
use crate::items::Item;

/// Lifecycle hooks of a record sink
pub trait ItemPipeline {
    fn name(&self) -> &'static str;

    /// Called once before the first record
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Handle one record and pass it on
    fn process_item(&mut self, item: Item) -> Result<Item>;

    /// Called once at end-of-stream
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Counts for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Feed lines read
    pub lines: u64,
    /// Records handed to the sinks
    pub records: u64,
    /// Lines carrying no record or an unmapped kind
    pub skipped: u64,
    /// Lines naming a known kind but failing to decode
    pub malformed: u64,
    /// Records a sink returned an error for
    pub failed: u64,
}

/// Ordered set of sinks sharing one record stream
#[derive(Default)]
pub struct PipelineRunner {
    stages: Vec<Box<dyn ItemPipeline>>,
}

impl PipelineRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: Box<dyn ItemPipeline>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every record of a JSON-lines feed through the sinks
    ///
    /// Malformed lines and per-record sink errors are logged and counted.
    /// Failing to read the feed, open a sink or close a sink aborts the run.
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<RunSummary> {
        for stage in &mut self.stages {
            stage
                .open()
                .with_context(|| format!("Failed to open {} sink", stage.name()))?;
        }

        let mut summary = RunSummary::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read record feed")?;
            summary.lines += 1;

            match decode_line(&line) {
                Ok(Some(item)) => {
                    summary.records += 1;
                    if !self.process(item) {
                        summary.failed += 1;
                    }
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    summary.malformed += 1;
                    error!(line = idx + 1, "Skipping record: {}", e);
                }
            }
        }

        for stage in &mut self.stages {
            debug!("Closing {} sink", stage.name());
            stage
                .close()
                .with_context(|| format!("Failed to close {} sink", stage.name()))?;
        }

        info!(
            lines = summary.lines,
            records = summary.records,
            skipped = summary.skipped,
            malformed = summary.malformed,
            failed = summary.failed,
            "Record feed finished"
        );
        Ok(summary)
    }

    /// Pass `item` through the stages, stopping at the first failure
    fn process(&mut self, mut item: Item) -> bool {
        let kind = item.kind();
        for stage in &mut self.stages {
            match stage.process_item(item) {
                Ok(next) => item = next,
                Err(e) => {
                    error!(sink = stage.name(), kind = %kind, "Sink failed on record: {:#}", e);
                    return false;
                }
            }
        }
        true
    }
}
