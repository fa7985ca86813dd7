//! SQLite storage layer for reading GameTrack's Core Data store.
//!
//! GameTrack keeps its library in `GameData.sqlite` inside the app container:
//! - `ZGAME` table: one row per game, keyed by `ZGAMEID` (the IGDB id)
//! - timestamps are Core Data reference dates (seconds since 2001-01-01 UTC)
//! - list columns are NSKeyedArchiver blobs, see [`super::archive`]

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};
use uuid::Uuid;

use super::archive::join_list;
use super::models::{Game, GameStatus};
use super::source::GameSource;
use crate::error::{Error, Result};

/// Offset between the Unix epoch and the Core Data reference date
const CORE_DATA_EPOCH_OFFSET: i64 = 978_307_200;

const GAME_QUERY: &str = "
    SELECT
        ZID, ZGAMEID, ZTITLE, ZSUMMARY, ZDEVELOPER, ZPUBLISHER, ZPOSTERURL, ZBANNERURL,
        ZRELEASEDATE, ZRELEASEYEAR, ZPLATFORMS, ZOWNEDPLATFORM, ZADDITIONALPLATFORMS,
        ZGAMESTATE, ZCOMPLETIONSTATE, ZCOMPLETION, ZPRIORITY, ZFORMAT, ZUSERRATING,
        ZCRITICRATING, ZHOURSPLAYED, ZADDITIONALPLAYTIME, ZSTARTDATE, ZFINISHDATE,
        ZADDEDDATE, ZNOTES, ZREVIEW, ZREVIEWSPOILERS, ZTIMETOBEATSTORY,
        ZTIMETOBEATEXTRAS, ZTIMETOBEATCOMPLETE, ZTIMETOBEATTYPE, ZSTEAMDECKSTATUS, ZGENRES
    FROM ZGAME
    ORDER BY ZGAMEID ASC, Z_PK ASC
    LIMIT ?1 OFFSET ?2";

/// Default location of the GameTrack database on macOS
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Library")
        .join("Containers")
        .join("com.joekw.gametrack")
        .join("Data")
        .join("Library")
        .join("Application Support")
        .join("GameTrack")
        .join("GameData.sqlite")
}

/// Convert a Core Data timestamp to a UTC datetime.
///
/// Returns `None` for values chrono can't represent.
pub fn from_core_data_timestamp(timestamp: f64) -> Option<DateTime<Utc>> {
    if !timestamp.is_finite() {
        return None;
    }
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9).round() as u32;
    let unix_secs = (secs as i64).checked_add(CORE_DATA_EPOCH_OFFSET)?;
    DateTime::from_timestamp(unix_secs, nanos.min(999_999_999))
}

/// ISO-8601 with millisecond precision and a `Z` suffix
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_core_data_date(timestamp: Option<f64>) -> String {
    timestamp
        .filter(|t| *t != 0.0)
        .and_then(from_core_data_timestamp)
        .map(format_timestamp)
        .unwrap_or_default()
}

/// `ZID` is a 16-byte UUID blob; anything else is treated as missing
fn blob_to_uuid(blob: Option<Vec<u8>>) -> String {
    blob.and_then(|b| Uuid::from_slice(&b).ok())
        .map(|u| u.hyphenated().to_string().to_uppercase())
        .unwrap_or_default()
}

/// Raw column values for one `ZGAME` row
struct GameRow {
    id: Option<Vec<u8>>,
    igdb_id: i64,
    title: String,
    summary: Option<String>,
    developer: Option<String>,
    publisher: Option<String>,
    poster_url: Option<String>,
    banner_url: Option<String>,
    release_date: Option<f64>,
    release_year: Option<i64>,
    platforms: Option<Vec<u8>>,
    owned_platform: Option<String>,
    additional_platforms: Option<Vec<u8>>,
    game_state: Option<i64>,
    completion_state: Option<i64>,
    completion: Option<i64>,
    priority: Option<i64>,
    format: Option<i64>,
    user_rating: Option<i64>,
    critic_rating: Option<i64>,
    hours_played: Option<f64>,
    additional_playtime: Option<f64>,
    start_date: Option<f64>,
    finish_date: Option<f64>,
    added_date: Option<f64>,
    notes: Option<String>,
    review: Option<String>,
    review_spoilers: Option<i64>,
    time_to_beat_story: Option<f64>,
    time_to_beat_extras: Option<f64>,
    time_to_beat_complete: Option<f64>,
    time_to_beat_type: Option<i64>,
    steam_deck_status: Option<i64>,
    genres: Option<Vec<u8>>,
}

impl GameRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(GameRow {
            id: row.get(0)?,
            igdb_id: row.get(1)?,
            title: row.get(2)?,
            summary: row.get(3)?,
            developer: row.get(4)?,
            publisher: row.get(5)?,
            poster_url: row.get(6)?,
            banner_url: row.get(7)?,
            release_date: row.get(8)?,
            release_year: row.get(9)?,
            platforms: row.get(10)?,
            owned_platform: row.get(11)?,
            additional_platforms: row.get(12)?,
            game_state: row.get(13)?,
            completion_state: row.get(14)?,
            completion: row.get(15)?,
            priority: row.get(16)?,
            format: row.get(17)?,
            user_rating: row.get(18)?,
            critic_rating: row.get(19)?,
            hours_played: row.get(20)?,
            additional_playtime: row.get(21)?,
            start_date: row.get(22)?,
            finish_date: row.get(23)?,
            added_date: row.get(24)?,
            notes: row.get(25)?,
            review: row.get(26)?,
            review_spoilers: row.get(27)?,
            time_to_beat_story: row.get(28)?,
            time_to_beat_extras: row.get(29)?,
            time_to_beat_complete: row.get(30)?,
            time_to_beat_type: row.get(31)?,
            steam_deck_status: row.get(32)?,
            genres: row.get(33)?,
        })
    }

    fn into_game(self) -> Result<Game> {
        let game_state = self.game_state.unwrap_or(0);
        let status = GameStatus::from_code(game_state).ok_or_else(|| Error::InvalidRecord {
            igdb_id: self.igdb_id,
            message: format!("unknown game state {game_state}"),
        })?;

        let release_date = self
            .release_date
            .filter(|t| *t != 0.0)
            .and_then(from_core_data_timestamp);
        let release_year = match self.release_year.unwrap_or(0) {
            0 => release_date.map(|d| d.year()).unwrap_or(0),
            year => i32::try_from(year).map_err(|_| Error::InvalidRecord {
                igdb_id: self.igdb_id,
                message: format!("release year {year} out of range"),
            })?,
        };

        Ok(Game {
            uuid: blob_to_uuid(self.id),
            igdb_id: self.igdb_id,
            wikidata_qid: String::new(),
            title: self.title,
            summary: self.summary.unwrap_or_default(),
            developer: self.developer.unwrap_or_default(),
            publisher: self.publisher.unwrap_or_default(),
            poster_url: self.poster_url.unwrap_or_default(),
            banner_url: self.banner_url.unwrap_or_default(),
            release_date: release_date.map(format_timestamp).unwrap_or_default(),
            release_year,
            platforms: join_list(self.platforms.as_deref()),
            owned_platform: self.owned_platform.unwrap_or_default(),
            additional_platforms: join_list(self.additional_platforms.as_deref()),
            status,
            game_state,
            completion_state: self.completion_state.unwrap_or(0),
            completion: self.completion.unwrap_or(0),
            priority: self.priority.unwrap_or(0),
            format: self.format.unwrap_or(0),
            user_rating: self.user_rating.unwrap_or(0),
            critic_rating: self.critic_rating.unwrap_or(0),
            hours_played: self.hours_played.unwrap_or(0.0),
            additional_playtime: self.additional_playtime.unwrap_or(0.0),
            start_date: format_core_data_date(self.start_date),
            finish_date: format_core_data_date(self.finish_date),
            added_date: format_core_data_date(self.added_date),
            notes: self.notes.unwrap_or_default(),
            review: self.review.unwrap_or_default(),
            review_spoilers: self.review_spoilers.unwrap_or(0) != 0,
            time_to_beat_story: self.time_to_beat_story.unwrap_or(0.0),
            time_to_beat_extras: self.time_to_beat_extras.unwrap_or(0.0),
            time_to_beat_complete: self.time_to_beat_complete.unwrap_or(0.0),
            time_to_beat_type: self.time_to_beat_type.unwrap_or(0),
            steam_deck_status: self.steam_deck_status.unwrap_or(0),
            genres: join_list(self.genres.as_deref()),
        })
    }
}

/// Read-only handle on a GameTrack database
pub struct GameTrackDb {
    db_path: PathBuf,
    conn: Connection,
}

impl GameTrackDb {
    /// Open the database read-only. The file must already exist.
    pub fn open(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            return Err(Error::DatabaseNotFound(db_path.display().to_string()));
        }
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(GameTrackDb {
            db_path: db_path.to_path_buf(),
            conn,
        })
    }

    /// Number of games in the library
    #[allow(dead_code)] // Used in tests
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ZGAME", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl GameSource for GameTrackDb {
    fn describe(&self) -> String {
        self.db_path.display().to_string()
    }

    fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Game>> {
        let mut stmt = self.conn.prepare_cached(GAME_QUERY)?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], GameRow::from_row)?;

        let mut games = Vec::with_capacity(limit.min(1024));
        for row in rows {
            games.push(row?.into_game()?);
        }
        Ok(games)
    }
}
