//! Relational sink: per-record reconciliation against SQLite
//!
//! Every record runs in its own transaction. The record kind selects one of
//! three strategies:
//! - unique-insert: insert unless a row with the same `id` exists, never update
//! - upsert-by-filter: insert, or update the row matching the composite key
//! - append-only: always insert
//!
//! A failing record is rolled back and logged; the stream carries on.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::repository::{key_values, RecordRepository};
use super::schema::create_tables;
use crate::config::StorageConfig;
use crate::items::{FieldValue, Item, Kind, Record};
use crate::pipeline::ItemPipeline;

/// Reconciliation policy for a record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// First write wins; later records with the same key are skipped
    UniqueInsert { key: &'static [&'static str] },
    /// Last write wins; later records update the stored row
    UpsertByFilter { key: &'static [&'static str] },
    /// No key, every record becomes a row
    AppendOnly,
}

impl Strategy {
    /// Dispatch table from record kind to strategy
    pub fn for_kind(kind: Kind) -> Strategy {
        match kind {
            Kind::Match | Kind::Player | Kind::Team => Strategy::UniqueInsert { key: &["id"] },
            Kind::MatchStats => Strategy::UpsertByFilter {
                key: &["match_id", "team_id"],
            },
            Kind::PlayerStats => Strategy::UpsertByFilter {
                key: &["player_id", "team_id", "match_id"],
            },
            Kind::MatchExtraStats | Kind::PlayerExtraStats | Kind::GameEvent => {
                Strategy::AppendOnly
            }
        }
    }
}

/// What a successful reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Skipped,
    Updated,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Inserted => write!(f, "inserted"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::Updated => write!(f, "updated"),
        }
    }
}

/// Per-run tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub inserted: u64,
    pub skipped: u64,
    pub updated: u64,
    pub failed: u64,
}

impl SinkStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Updated => self.updated += 1,
        }
    }
}

/// Run the strategy for `R` against an open unit of work
fn reconcile<R: Record>(conn: &Connection, record: &R) -> Result<Outcome> {
    let repo = RecordRepository::new(conn);
    let kind = R::KIND;

    match Strategy::for_kind(kind) {
        Strategy::UniqueInsert { key } => {
            if repo.exists(kind, key, &key_values(record, key))? {
                info!(kind = %kind, "\"{}\" already existing in DB", kind);
                Ok(Outcome::Skipped)
            } else {
                insert(&repo, record)
            }
        }
        Strategy::UpsertByFilter { key } => {
            if repo.exists(kind, key, &key_values(record, key))? {
                repo.update(record, key)?;
                info!(kind = %kind, "Updating \"{}\" item", kind);
                Ok(Outcome::Updated)
            } else {
                insert(&repo, record)
            }
        }
        Strategy::AppendOnly => insert(&repo, record),
    }
}

fn insert<R: Record>(repo: &RecordRepository<'_>, record: &R) -> Result<Outcome> {
    info!(kind = %R::KIND, "Inserting entry of type \"{}\" in DB", R::KIND);
    repo.insert(record)?;
    Ok(Outcome::Inserted)
}

/// Sink persisting records into SQLite
pub struct RelationalSink {
    conn: Connection,
    location: String,
    stats: SinkStats,
}

impl RelationalSink {
    /// Open the store at `config.db_path`, creating the schema if needed
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let db_path = config.db_path.as_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

        Self::with_connection(conn, db_path, config.foreign_keys)
    }

    /// Create an in-memory sink (for testing)
    #[cfg(test)]
    pub fn in_memory(foreign_keys: bool) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, Path::new(":memory:"), foreign_keys)
    }

    fn with_connection(conn: Connection, location: &Path, foreign_keys: bool) -> Result<Self> {
        // Bundled SQLite enforces foreign keys unless told otherwise
        let pragma = if foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys = {}", pragma))
            .context("Failed to set foreign_keys pragma")?;

        create_tables(&conn).context("Failed to create tables")?;

        Ok(Self {
            conn,
            location: location.display().to_string(),
            stats: SinkStats::default(),
        })
    }

    /// Persist one record inside its own transaction
    ///
    /// Commits on success. On failure the transaction is rolled back before
    /// the error is returned, so nothing from `item` reaches the store.
    pub fn persist(&mut self, item: &Item) -> Result<Outcome> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin transaction")?;

        let result = match item {
            Item::Match(r) => reconcile(&tx, r),
            Item::Player(r) => reconcile(&tx, r),
            Item::Team(r) => reconcile(&tx, r),
            Item::MatchStats(r) => reconcile(&tx, r),
            Item::MatchExtraStats(r) => reconcile(&tx, r),
            Item::PlayerStats(r) => reconcile(&tx, r),
            Item::PlayerExtraStats(r) => reconcile(&tx, r),
            Item::GameEvent(r) => reconcile(&tx, r),
        };

        match result {
            Ok(outcome) => {
                tx.commit().context("Failed to commit transaction")?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Persist `item`, logging instead of returning any failure
    ///
    /// The record is always handed back unchanged.
    pub fn process(&mut self, item: Item) -> Item {
        match self.persist(&item) {
            Ok(outcome) => {
                debug!(kind = %item.kind(), "Record {}", outcome);
                self.stats.record(outcome);
            }
            Err(e) => {
                self.stats.failed += 1;
                error!(kind = %item.kind(), "Error while committing to DB: {:#}", e);
            }
        }
        item
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    // ==================== Query Operations ====================

    /// Get row count for a kind
    pub fn row_count(&self, kind: Kind) -> Result<i64> {
        RecordRepository::new(&self.conn).count(kind)
    }

    /// Get row counts for every kind
    pub fn row_counts(&self) -> Result<Vec<(Kind, i64)>> {
        Kind::ALL
            .into_iter()
            .map(|kind| self.row_count(kind).map(|count| (kind, count)))
            .collect()
    }

    /// Get stored rows of a kind, columns in field order
    pub fn fetch_rows(&self, kind: Kind) -> Result<Vec<Vec<FieldValue>>> {
        RecordRepository::new(&self.conn).fetch_all(kind)
    }
}

impl ItemPipeline for RelationalSink {
    fn name(&self) -> &'static str {
        "relational"
    }

    fn open(&mut self) -> Result<()> {
        info!("Relational sink writing to {}", self.location);
        Ok(())
    }

    fn process_item(&mut self, item: Item) -> Result<Item> {
        Ok(self.process(item))
    }

    fn close(&mut self) -> Result<()> {
        let stats = self.stats;
        info!(
            inserted = stats.inserted,
            skipped = stats.skipped,
            updated = stats.updated,
            failed = stats.failed,
            "Relational sink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{
        FieldValue, GameEvent, Match, MatchExtraStats, MatchStats, Player, PlayerStats, Team,
    };

    fn test_match(id: i64, competition: &str) -> Item {
        Item::Match(Match {
            id,
            competition: Some(competition.to_string()),
            ..Default::default()
        })
    }

    fn test_match_stats(tries: i64) -> Item {
        Item::MatchStats(MatchStats {
            match_id: 1,
            team_id: 2,
            tries: Some(tries),
            ..Default::default()
        })
    }

    #[test]
    fn test_dispatch_table() {
        assert_eq!(
            Strategy::for_kind(Kind::Team),
            Strategy::UniqueInsert { key: &["id"] }
        );
        assert_eq!(
            Strategy::for_kind(Kind::PlayerStats),
            Strategy::UpsertByFilter {
                key: &["player_id", "team_id", "match_id"]
            }
        );
        assert_eq!(Strategy::for_kind(Kind::GameEvent), Strategy::AppendOnly);
    }

    #[test]
    fn test_unique_insert_first_wins() {
        let mut sink = RelationalSink::in_memory(false).unwrap();

        assert_eq!(sink.persist(&test_match(1, "A")).unwrap(), Outcome::Inserted);
        assert_eq!(sink.persist(&test_match(1, "B")).unwrap(), Outcome::Skipped);

        let rows = sink.fetch_rows(Kind::Match).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], FieldValue::Text("A".to_string()));
    }

    #[test]
    fn test_unique_insert_per_kind() {
        let mut sink = RelationalSink::in_memory(false).unwrap();

        let player = Item::Player(Player {
            id: 1,
            name: Some("Antoine Dupont".to_string()),
            ..Default::default()
        });
        let team = Item::Team(Team {
            id: 1,
            name: Some("France".to_string()),
            ..Default::default()
        });

        // Same id in different tables does not collide
        assert_eq!(sink.persist(&player).unwrap(), Outcome::Inserted);
        assert_eq!(sink.persist(&team).unwrap(), Outcome::Inserted);
        assert_eq!(sink.persist(&test_match(1, "A")).unwrap(), Outcome::Inserted);
        assert_eq!(sink.persist(&player).unwrap(), Outcome::Skipped);

        assert_eq!(sink.row_count(Kind::Player).unwrap(), 1);
        assert_eq!(sink.row_count(Kind::Team).unwrap(), 1);
        assert_eq!(sink.row_count(Kind::Match).unwrap(), 1);
    }

    #[test]
    fn test_upsert_last_wins() {
        let mut sink = RelationalSink::in_memory(false).unwrap();

        assert_eq!(sink.persist(&test_match_stats(3)).unwrap(), Outcome::Inserted);
        assert_eq!(sink.persist(&test_match_stats(5)).unwrap(), Outcome::Updated);
        assert_eq!(sink.persist(&test_match_stats(7)).unwrap(), Outcome::Updated);

        let rows = sink.fetch_rows(Kind::MatchStats).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], FieldValue::Integer(7));
    }

    #[test]
    fn test_upsert_distinct_keys() {
        let mut sink = RelationalSink::in_memory(false).unwrap();

        for (player_id, team_id) in [(1, 1), (2, 1), (1, 2), (1, 1)] {
            let item = Item::PlayerStats(PlayerStats {
                player_id,
                team_id,
                match_id: 10,
                tackles: Some(player_id * 10),
                ..Default::default()
            });
            sink.persist(&item).unwrap();
        }

        assert_eq!(sink.row_count(Kind::PlayerStats).unwrap(), 3);
        assert_eq!(sink.stats(), SinkStats::default());
    }

    #[test]
    fn test_append_only_keeps_duplicates() {
        let mut sink = RelationalSink::in_memory(false).unwrap();
        let event = Item::GameEvent(GameEvent {
            match_id: 1,
            minute: Some(23),
            event_type: Some("yellow card".to_string()),
            ..Default::default()
        });
        let extra = Item::MatchExtraStats(MatchExtraStats {
            match_id: 1,
            team_id: 2,
            name: Some("lineouts won".to_string()),
            value: Some("12".to_string()),
        });

        for _ in 0..4 {
            assert_eq!(sink.persist(&event).unwrap(), Outcome::Inserted);
        }
        sink.persist(&extra).unwrap();
        sink.persist(&extra).unwrap();

        assert_eq!(sink.row_count(Kind::GameEvent).unwrap(), 4);
        assert_eq!(sink.row_count(Kind::MatchExtraStats).unwrap(), 2);
    }

    #[test]
    fn test_failed_record_rolls_back() {
        let mut sink = RelationalSink::in_memory(true).unwrap();

        // Parent match and team are missing
        assert!(sink.persist(&test_match_stats(3)).is_err());
        assert_eq!(sink.row_count(Kind::MatchStats).unwrap(), 0);

        // The next record gets a fresh transaction
        sink.persist(&test_match(1, "A")).unwrap();
        sink.persist(&Item::Team(Team {
            id: 2,
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(sink.persist(&test_match_stats(3)).unwrap(), Outcome::Inserted);
        assert_eq!(sink.row_count(Kind::MatchStats).unwrap(), 1);
    }

    #[test]
    fn test_process_swallows_errors() {
        let mut sink = RelationalSink::in_memory(true).unwrap();
        let item = test_match_stats(3);

        let returned = sink.process(item.clone());
        assert_eq!(returned, item);
        assert_eq!(sink.stats().failed, 1);
        assert_eq!(sink.row_count(Kind::MatchStats).unwrap(), 0);

        sink.process(test_match(4, "A"));
        sink.process(test_match(4, "B"));
        assert_eq!(
            sink.stats(),
            SinkStats {
                inserted: 1,
                skipped: 1,
                updated: 0,
                failed: 1,
            }
        );
    }

    #[test]
    fn test_orphan_records_stored_without_foreign_keys() {
        let mut sink = RelationalSink::in_memory(false).unwrap();

        // No parent match, team or player rows exist
        assert_eq!(sink.persist(&test_match_stats(3)).unwrap(), Outcome::Inserted);
        let event = Item::GameEvent(GameEvent {
            match_id: 9,
            team_id: Some(8),
            player_id: Some(7),
            minute: Some(40),
            event_type: Some("try".to_string()),
        });
        assert_eq!(sink.persist(&event).unwrap(), Outcome::Inserted);

        assert_eq!(sink.row_count(Kind::MatchStats).unwrap(), 1);
        assert_eq!(sink.row_count(Kind::GameEvent).unwrap(), 1);
        assert_eq!(sink.stats().failed, 0);
    }

    #[test]
    fn test_upsert_null_clears_stored_field() {
        let mut sink = RelationalSink::in_memory(false).unwrap();
        sink.persist(&test_match_stats(3)).unwrap();

        let cleared = crate::feed::decode_line(
            r#"{"kind":"MatchStats","match_id":1,"team_id":2,"tries":null,"tackles":90}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(sink.persist(&cleared).unwrap(), Outcome::Updated);

        let rows = sink.fetch_rows(Kind::MatchStats).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], FieldValue::Null);
        assert_eq!(rows[0][8], FieldValue::Integer(90));
    }

    #[test]
    fn test_row_counts_cover_all_kinds() {
        let mut sink = RelationalSink::in_memory(false).unwrap();
        sink.process(test_match(1, "A"));

        let counts = sink.row_counts().unwrap();
        assert_eq!(counts.len(), Kind::ALL.len());
        assert!(counts.contains(&(Kind::Match, 1)));
        assert!(counts.contains(&(Kind::GameEvent, 0)));
    }

    #[test]
    fn test_new_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            db_path: dir.path().join("nested").join("rugby.sqlite"),
            ..Default::default()
        };

        {
            let mut sink = RelationalSink::new(&config).unwrap();
            sink.process(test_match(1, "A"));
        }
        assert!(config.db_path.exists());

        // Reopening keeps existing rows
        let sink = RelationalSink::new(&config).unwrap();
        assert_eq!(sink.row_count(Kind::Match).unwrap(), 1);
    }
}
