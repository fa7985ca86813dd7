//! Data models representing a GameTrack library.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// CSV column order. Must match the field order of [`Game`].
pub const GAME_FIELDS: [&str; 36] = [
    "uuid",
    "igdb_id",
    "wikidata_qid",
    "title",
    "summary",
    "developer",
    "publisher",
    "poster_url",
    "banner_url",
    "release_date",
    "release_year",
    "platforms",
    "owned_platform",
    "additional_platforms",
    "status",
    "game_state",
    "completion_state",
    "completion",
    "priority",
    "format",
    "user_rating",
    "critic_rating",
    "hours_played",
    "additional_playtime",
    "start_date",
    "finish_date",
    "added_date",
    "notes",
    "review",
    "review_spoilers",
    "time_to_beat_story",
    "time_to_beat_extras",
    "time_to_beat_complete",
    "time_to_beat_type",
    "steam_deck_status",
    "genres",
];

/// Library shelf a game sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum GameStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    Queued,
    #[default]
    Collection,
    Completed,
    Abandoned,
    Wanted,
}

impl GameStatus {
    pub const ALL: [GameStatus; 6] = [
        GameStatus::InProgress,
        GameStatus::Queued,
        GameStatus::Collection,
        GameStatus::Completed,
        GameStatus::Abandoned,
        GameStatus::Wanted,
    ];

    /// Decode GameTrack's `ZGAMESTATE` column (1-based)
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(GameStatus::InProgress),
            2 => Some(GameStatus::Queued),
            3 => Some(GameStatus::Collection),
            4 => Some(GameStatus::Completed),
            5 => Some(GameStatus::Abandoned),
            6 => Some(GameStatus::Wanted),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::InProgress => "In Progress",
            GameStatus::Queued => "Queued",
            GameStatus::Collection => "Collection",
            GameStatus::Completed => "Completed",
            GameStatus::Abandoned => "Abandoned",
            GameStatus::Wanted => "Wanted",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One game in the library, flattened to a CSV row.
///
/// Dates are ISO-8601 UTC strings (empty when unset), list fields are
/// `|`-joined. Numeric fields accept empty cells and JSON nulls as zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Game {
    pub uuid: String,
    #[serde(deserialize_with = "lenient")]
    pub igdb_id: i64,
    pub wikidata_qid: String,
    pub title: String,
    pub summary: String,
    pub developer: String,
    pub publisher: String,
    pub poster_url: String,
    pub banner_url: String,
    pub release_date: String,
    #[serde(deserialize_with = "lenient")]
    pub release_year: i32,
    pub platforms: String,
    pub owned_platform: String,
    pub additional_platforms: String,
    pub status: GameStatus,
    #[serde(deserialize_with = "lenient")]
    pub game_state: i64,
    #[serde(deserialize_with = "lenient")]
    pub completion_state: i64,
    #[serde(deserialize_with = "lenient")]
    pub completion: i64,
    #[serde(deserialize_with = "lenient")]
    pub priority: i64,
    #[serde(deserialize_with = "lenient")]
    pub format: i64,
    #[serde(deserialize_with = "lenient")]
    pub user_rating: i64,
    #[serde(deserialize_with = "lenient")]
    pub critic_rating: i64,
    #[serde(deserialize_with = "lenient")]
    pub hours_played: f64,
    #[serde(deserialize_with = "lenient")]
    pub additional_playtime: f64,
    pub start_date: String,
    pub finish_date: String,
    pub added_date: String,
    pub notes: String,
    pub review: String,
    #[serde(deserialize_with = "lenient")]
    pub review_spoilers: bool,
    #[serde(deserialize_with = "lenient")]
    pub time_to_beat_story: f64,
    #[serde(deserialize_with = "lenient")]
    pub time_to_beat_extras: f64,
    #[serde(deserialize_with = "lenient")]
    pub time_to_beat_complete: f64,
    #[serde(deserialize_with = "lenient")]
    pub time_to_beat_type: i64,
    #[serde(deserialize_with = "lenient")]
    pub steam_deck_status: i64,
    pub genres: String,
}

impl Game {
    /// Fill `release_year` from the `release_date` prefix when it is unset
    pub fn backfill_release_year(&mut self) {
        if self.release_year != 0 {
            return;
        }
        self.release_year = self
            .release_date
            .split('-')
            .next()
            .and_then(|year| year.parse().ok())
            .unwrap_or(0);
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Value(T),
    Text(String),
}

/// Accept a typed value, a numeric string, or an empty/null cell (as default)
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr + Default,
    T::Err: fmt::Display,
{
    match Option::<Loose<T>>::deserialize(deserializer)? {
        None => Ok(T::default()),
        Some(Loose::Value(value)) => Ok(value),
        Some(Loose::Text(text)) if text.trim().is_empty() => Ok(T::default()),
        Some(Loose::Text(text)) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
