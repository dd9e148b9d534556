//! Scraped record types.
//!
//! Every record the extractor emits is one of eight kinds. Each kind has a
//! fixed, ordered field list which doubles as its table columns and its CSV
//! header, and an explicit mapping from struct fields to scalar values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar value of a single record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Real(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        FieldValue::Text(v.format("%Y-%m-%d").to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// Null renders as an empty cell
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Real(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

/// Tag naming which record shape a value has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Match,
    Player,
    Team,
    MatchStats,
    MatchExtraStats,
    PlayerStats,
    PlayerExtraStats,
    GameEvent,
}

impl Kind {
    pub const ALL: [Kind; 8] = [
        Kind::Match,
        Kind::Player,
        Kind::Team,
        Kind::MatchStats,
        Kind::MatchExtraStats,
        Kind::PlayerStats,
        Kind::PlayerExtraStats,
        Kind::GameEvent,
    ];

    /// Record kind name, as used in the feed tag and export file names
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Match => "Match",
            Kind::Player => "Player",
            Kind::Team => "Team",
            Kind::MatchStats => "MatchStats",
            Kind::MatchExtraStats => "MatchExtraStats",
            Kind::PlayerStats => "PlayerStats",
            Kind::PlayerExtraStats => "PlayerExtraStats",
            Kind::GameEvent => "GameEvent",
        }
    }

    /// Resolve a kind from its name, `None` when no kind matches
    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            Kind::Match => "matches",
            Kind::Player => "players",
            Kind::Team => "teams",
            Kind::MatchStats => "match_stats",
            Kind::MatchExtraStats => "match_extra_stats",
            Kind::PlayerStats => "player_stats",
            Kind::PlayerExtraStats => "player_extra_stats",
            Kind::GameEvent => "game_events",
        }
    }

    /// Ordered field names
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Kind::Match => Match::FIELDS,
            Kind::Player => Player::FIELDS,
            Kind::Team => Team::FIELDS,
            Kind::MatchStats => MatchStats::FIELDS,
            Kind::MatchExtraStats => MatchExtraStats::FIELDS,
            Kind::PlayerStats => PlayerStats::FIELDS,
            Kind::PlayerExtraStats => PlayerExtraStats::FIELDS,
            Kind::GameEvent => GameEvent::FIELDS,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicit field mapping of a record kind
pub trait Record {
    const KIND: Kind;

    /// Field names, in column order
    const FIELDS: &'static [&'static str];

    /// Field values, aligned with `FIELDS`
    fn values(&self) -> Vec<FieldValue>;

    /// Value of a single named field
    fn value_of(&self, field: &str) -> Option<FieldValue> {
        let idx = Self::FIELDS.iter().position(|f| *f == field)?;
        self.values().into_iter().nth(idx)
    }
}

// ==================== Keyed by id ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub competition: Option<String>,
    pub venue: Option<String>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

impl Record for Match {
    const KIND: Kind = Kind::Match;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "date",
        "competition",
        "venue",
        "home_team_id",
        "away_team_id",
        "home_score",
        "away_score",
    ];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.date.into(),
            self.competition.clone().into(),
            self.venue.clone().into(),
            self.home_team_id.into(),
            self.away_team_id.into(),
            self.home_score.into(),
            self.away_score.into(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: Option<String>,
    pub position: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub height_cm: Option<i64>,
    pub weight_kg: Option<i64>,
}

impl Record for Player {
    const KIND: Kind = Kind::Player;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "position",
        "date_of_birth",
        "height_cm",
        "weight_kg",
    ];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.position.clone().into(),
            self.date_of_birth.into(),
            self.height_cm.into(),
            self.weight_kg.into(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: Option<String>,
    pub country: Option<String>,
}

impl Record for Team {
    const KIND: Kind = Kind::Team;
    const FIELDS: &'static [&'static str] = &["id", "name", "country"];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.country.clone().into(),
        ]
    }
}

// ==================== Keyed by composite filter ====================

/// Team-level statistics for one match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub match_id: i64,
    pub team_id: i64,
    pub tries: Option<i64>,
    pub conversions: Option<i64>,
    pub penalties: Option<i64>,
    pub drop_goals: Option<i64>,
    pub possession: Option<f64>,
    pub territory: Option<f64>,
    pub tackles: Option<i64>,
    pub missed_tackles: Option<i64>,
    pub penalties_conceded: Option<i64>,
}

impl Record for MatchStats {
    const KIND: Kind = Kind::MatchStats;
    const FIELDS: &'static [&'static str] = &[
        "match_id",
        "team_id",
        "tries",
        "conversions",
        "penalties",
        "drop_goals",
        "possession",
        "territory",
        "tackles",
        "missed_tackles",
        "penalties_conceded",
    ];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.match_id.into(),
            self.team_id.into(),
            self.tries.into(),
            self.conversions.into(),
            self.penalties.into(),
            self.drop_goals.into(),
            self.possession.into(),
            self.territory.into(),
            self.tackles.into(),
            self.missed_tackles.into(),
            self.penalties_conceded.into(),
        ]
    }
}

/// Player-level statistics for one match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: i64,
    pub team_id: i64,
    pub match_id: i64,
    pub tries: Option<i64>,
    pub try_assists: Option<i64>,
    pub points: Option<i64>,
    pub carries: Option<i64>,
    pub metres_gained: Option<i64>,
    pub tackles: Option<i64>,
    pub missed_tackles: Option<i64>,
    pub minutes_played: Option<i64>,
}

impl Record for PlayerStats {
    const KIND: Kind = Kind::PlayerStats;
    const FIELDS: &'static [&'static str] = &[
        "player_id",
        "team_id",
        "match_id",
        "tries",
        "try_assists",
        "points",
        "carries",
        "metres_gained",
        "tackles",
        "missed_tackles",
        "minutes_played",
    ];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.player_id.into(),
            self.team_id.into(),
            self.match_id.into(),
            self.tries.into(),
            self.try_assists.into(),
            self.points.into(),
            self.carries.into(),
            self.metres_gained.into(),
            self.tackles.into(),
            self.missed_tackles.into(),
            self.minutes_played.into(),
        ]
    }
}

// ==================== Append-only ====================

/// Free-form team statistic not covered by `MatchStats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchExtraStats {
    pub match_id: i64,
    pub team_id: i64,
    pub name: Option<String>,
    pub value: Option<String>,
}

impl Record for MatchExtraStats {
    const KIND: Kind = Kind::MatchExtraStats;
    const FIELDS: &'static [&'static str] = &["match_id", "team_id", "name", "value"];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.match_id.into(),
            self.team_id.into(),
            self.name.clone().into(),
            self.value.clone().into(),
        ]
    }
}

/// Free-form player statistic not covered by `PlayerStats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerExtraStats {
    pub player_id: i64,
    pub team_id: i64,
    pub match_id: i64,
    pub name: Option<String>,
    pub value: Option<String>,
}

impl Record for PlayerExtraStats {
    const KIND: Kind = Kind::PlayerExtraStats;
    const FIELDS: &'static [&'static str] =
        &["player_id", "team_id", "match_id", "name", "value"];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.player_id.into(),
            self.team_id.into(),
            self.match_id.into(),
            self.name.clone().into(),
            self.value.clone().into(),
        ]
    }
}

/// Timeline event (try, card, substitution, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub match_id: i64,
    pub team_id: Option<i64>,
    pub player_id: Option<i64>,
    pub minute: Option<i64>,
    pub event_type: Option<String>,
}

impl Record for GameEvent {
    const KIND: Kind = Kind::GameEvent;
    const FIELDS: &'static [&'static str] =
        &["match_id", "team_id", "player_id", "minute", "event_type"];

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.match_id.into(),
            self.team_id.into(),
            self.player_id.into(),
            self.minute.into(),
            self.event_type.clone().into(),
        ]
    }
}

// ==================== Tagged union ====================

/// A single scraped record of any kind
///
/// Serialized with an inline `"kind"` tag, e.g.
/// `{"kind": "Team", "id": 4, "name": "Leinster"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Item {
    Match(Match),
    Player(Player),
    Team(Team),
    MatchStats(MatchStats),
    MatchExtraStats(MatchExtraStats),
    PlayerStats(PlayerStats),
    PlayerExtraStats(PlayerExtraStats),
    GameEvent(GameEvent),
}

impl Item {
    pub fn kind(&self) -> Kind {
        match self {
            Item::Match(_) => Kind::Match,
            Item::Player(_) => Kind::Player,
            Item::Team(_) => Kind::Team,
            Item::MatchStats(_) => Kind::MatchStats,
            Item::MatchExtraStats(_) => Kind::MatchExtraStats,
            Item::PlayerStats(_) => Kind::PlayerStats,
            Item::PlayerExtraStats(_) => Kind::PlayerExtraStats,
            Item::GameEvent(_) => Kind::GameEvent,
        }
    }

    /// Field values in the kind's column order
    pub fn values(&self) -> Vec<FieldValue> {
        match self {
            Item::Match(r) => r.values(),
            Item::Player(r) => r.values(),
            Item::Team(r) => r.values(),
            Item::MatchStats(r) => r.values(),
            Item::MatchExtraStats(r) => r.values(),
            Item::PlayerStats(r) => r.values(),
            Item::PlayerExtraStats(r) => r.values(),
            Item::GameEvent(r) => r.values(),
        }
    }
}
