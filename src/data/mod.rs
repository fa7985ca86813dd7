//! Data layer for reading a GameTrack library.
//!
//! Handles the game model, paging over a source, and GameTrack's local SQLite store.

mod archive;
mod models;
mod source;
mod storage;

pub use models::{Game, GameStatus, GAME_FIELDS};
pub use source::{fetch_all, GameSource, PAGE_SIZE};
pub use storage::{default_db_path, GameTrackDb};
