//! Flat-file sink: one CSV export per record kind.
//!
//! Writers are created lazily, the first time a kind is seen, as
//! `<output_dir>/<KindName>.csv`. An existing file of that name is truncated.
//! The header row is written when the writer is created.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::items::{Item, Kind};
use crate::pipeline::ItemPipeline;

/// Sink fanning records out into per-kind CSV files
pub struct FlatFileSink {
    output_dir: PathBuf,
    exporters: HashMap<Kind, csv::Writer<File>>,
}

impl FlatFileSink {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            exporters: HashMap::new(),
        }
    }

    /// Path of the export for `kind`
    pub fn export_path(&self, kind: Kind) -> PathBuf {
        export_path(&self.output_dir, kind)
    }

    /// Kinds with an open writer
    pub fn active_kinds(&self) -> Vec<Kind> {
        let mut kinds: Vec<Kind> = self.exporters.keys().copied().collect();
        kinds.sort();
        kinds
    }

    fn exporter_for(&mut self, kind: Kind) -> Result<&mut csv::Writer<File>> {
        if !self.exporters.contains_key(&kind) {
            let path = export_path(&self.output_dir, kind);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;

            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            writer.write_record(kind.fields())?;

            debug!(kind = %kind, "Started export to {}", path.display());
            self.exporters.insert(kind, writer);
        }

        self.exporters
            .get_mut(&kind)
            .context("exporter missing after creation")
    }

    /// Append `item` as one row of its kind's export
    pub fn process(&mut self, item: Item) -> Result<Item> {
        let exporter = self.exporter_for(item.kind())?;
        exporter.write_record(item.values().iter().map(|v| v.to_string()))?;
        Ok(item)
    }

    /// Finish every export, then close every file
    ///
    /// Errors are not handled here and reach the caller.
    pub fn close(&mut self) -> Result<()> {
        for writer in self.exporters.values_mut() {
            writer.flush()?;
        }

        let count = self.exporters.len();
        for (kind, writer) in self.exporters.drain() {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            debug!(kind = %kind, "Closed export");
        }

        info!("Closed {} CSV exports in {}", count, self.output_dir.display());
        Ok(())
    }
}

fn export_path(output_dir: &Path, kind: Kind) -> PathBuf {
    output_dir.join(format!("{}.csv", kind.name()))
}

impl ItemPipeline for FlatFileSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn open(&mut self) -> Result<()> {
        // Writers are never reopened mid-stream
        anyhow::ensure!(
            self.exporters.is_empty(),
            "CSV sink already has {} open exports",
            self.exporters.len()
        );
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create export directory {}",
                self.output_dir.display()
            )
        })?;
        Ok(())
    }

    fn process_item(&mut self, item: Item) -> Result<Item> {
        self.process(item)
    }

    fn close(&mut self) -> Result<()> {
        FlatFileSink::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{GameEvent, Match, MatchStats, Team};
    use std::fs;

    fn test_sink(dir: &Path) -> FlatFileSink {
        let mut sink = FlatFileSink::new(&ExportConfig {
            enabled: true,
            output_dir: dir.to_path_buf(),
        });
        sink.open().unwrap();
        sink
    }

    fn team(id: i64, name: &str) -> Item {
        Item::Team(Team {
            id,
            name: Some(name.to_string()),
            country: None,
        })
    }

    #[test]
    fn test_one_file_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(dir.path());

        sink.process(team(1, "Wales")).unwrap();
        sink.process(Item::Match(Match {
            id: 5,
            ..Default::default()
        }))
        .unwrap();
        sink.process(team(2, "Italy")).unwrap();
        assert_eq!(sink.active_kinds(), vec![Kind::Match, Kind::Team]);
        sink.close().unwrap();

        let mut files: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        assert_eq!(files, vec!["Match.csv", "Team.csv"]);

        let teams = fs::read_to_string(dir.path().join("Team.csv")).unwrap();
        assert_eq!(teams, "id,name,country\n1,Wales,\n2,Italy,\n");
    }

    #[test]
    fn test_rows_keep_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(dir.path());

        for minute in [3, 17, 17, 64] {
            sink.process(Item::GameEvent(GameEvent {
                match_id: 1,
                minute: Some(minute),
                event_type: Some("try".to_string()),
                ..Default::default()
            }))
            .unwrap();
        }
        sink.close().unwrap();

        let content = fs::read_to_string(sink.export_path(Kind::GameEvent)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "match_id,team_id,player_id,minute,event_type");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "1,,,3,try");
        assert_eq!(lines[4], "1,,,64,try");
    }

    #[test]
    fn test_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(dir.path());

        sink.process(team(1, "Cardiff, \"Blues\"")).unwrap();
        sink.close().unwrap();

        let content = fs::read_to_string(sink.export_path(Kind::Team)).unwrap();
        assert_eq!(content, "id,name,country\n1,\"Cardiff, \"\"Blues\"\"\",\n");
    }

    #[test]
    fn test_header_written_before_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(dir.path());

        sink.process(Item::MatchStats(MatchStats {
            match_id: 1,
            team_id: 2,
            tries: Some(3),
            possession: Some(52.5),
            ..Default::default()
        }))
        .unwrap();
        sink.close().unwrap();

        let content = fs::read_to_string(sink.export_path(Kind::MatchStats)).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(Kind::MatchStats.fields().join(",").as_str()));
        assert_eq!(lines.next(), Some("1,2,3,,,,52.5,,,,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_existing_export_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Team.csv"), "stale contents\n").unwrap();

        let mut sink = test_sink(dir.path());
        sink.process(team(9, "Georgia")).unwrap();
        sink.close().unwrap();

        let content = fs::read_to_string(dir.path().join("Team.csv")).unwrap();
        assert_eq!(content, "id,name,country\n9,Georgia,\n");
    }

    #[test]
    fn test_close_without_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(dir.path());
        sink.close().unwrap();

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_with_live_exports_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(dir.path());
        sink.process(team(1, "Samoa")).unwrap();

        assert!(sink.open().is_err());
        assert_eq!(sink.active_kinds(), vec![Kind::Team]);

        sink.process(team(2, "Tonga")).unwrap();
        sink.close().unwrap();
        let content = fs::read_to_string(sink.export_path(Kind::Team)).unwrap();
        assert_eq!(content, "id,name,country\n1,Samoa,\n2,Tonga,\n");

        // Closed sinks can be opened again
        sink.open().unwrap();
    }

    #[test]
    fn test_missing_output_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FlatFileSink::new(&ExportConfig {
            enabled: true,
            output_dir: dir.path().join("never-created"),
        });

        // open() was skipped, so the directory does not exist
        assert!(sink.process(team(1, "Fiji")).is_err());
    }
}
