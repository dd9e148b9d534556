//! SQLite schema definitions for scraped rugby data
//!
//! Tables:
//! - matches, players, teams: entities keyed by their scraped `id`
//! - match_stats: team statistics, unique per (match_id, team_id)
//! - player_stats: player statistics, unique per (player_id, team_id, match_id)
//! - match_extra_stats, player_extra_stats, game_events: append-only logs

use rusqlite::{Connection, Result};

/// Create all tables in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY,
            name TEXT,
            country TEXT
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY,
            name TEXT,
            position TEXT,
            date_of_birth TEXT,
            height_cm INTEGER,
            weight_kg INTEGER
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY,
            date TEXT,
            competition TEXT,
            venue TEXT,
            home_team_id INTEGER REFERENCES teams(id),
            away_team_id INTEGER REFERENCES teams(id),
            home_score INTEGER,
            away_score INTEGER
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS match_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL REFERENCES matches(id),
            team_id INTEGER NOT NULL REFERENCES teams(id),
            tries INTEGER,
            conversions INTEGER,
            penalties INTEGER,
            drop_goals INTEGER,
            possession REAL,
            territory REAL,
            tackles INTEGER,
            missed_tackles INTEGER,
            penalties_conceded INTEGER,
            UNIQUE(match_id, team_id)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS player_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL REFERENCES players(id),
            team_id INTEGER NOT NULL REFERENCES teams(id),
            match_id INTEGER NOT NULL REFERENCES matches(id),
            tries INTEGER,
            try_assists INTEGER,
            points INTEGER,
            carries INTEGER,
            metres_gained INTEGER,
            tackles INTEGER,
            missed_tackles INTEGER,
            minutes_played INTEGER,
            UNIQUE(player_id, team_id, match_id)
        )
        "#,
        [],
    )?;

    // Append-only, no uniqueness
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS match_extra_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL REFERENCES matches(id),
            team_id INTEGER NOT NULL REFERENCES teams(id),
            name TEXT,
            value TEXT
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS player_extra_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL REFERENCES players(id),
            team_id INTEGER NOT NULL REFERENCES teams(id),
            match_id INTEGER NOT NULL REFERENCES matches(id),
            name TEXT,
            value TEXT
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS game_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL REFERENCES matches(id),
            team_id INTEGER REFERENCES teams(id),
            player_id INTEGER REFERENCES players(id),
            minute INTEGER,
            event_type TEXT
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_match_extra_stats_match ON match_extra_stats(match_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_player_extra_stats_player ON player_extra_stats(player_id, match_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_game_events_match ON game_events(match_id)",
        [],
    )?;

    Ok(())
}
