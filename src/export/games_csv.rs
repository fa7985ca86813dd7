//! CSV export and re-import of the game library.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

use crate::data::{Game, GAME_FIELDS};
use crate::error::Result;

/// Write the header and one row per game. Returns the number of rows written.
pub fn write_games<W: Write>(writer: W, games: &[Game]) -> Result<usize> {
    // Header is written by hand so an empty library still gets one
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(writer);

    writer.write_record(GAME_FIELDS)?;
    for game in games {
        writer.serialize(game)?;
    }
    writer.flush()?;

    Ok(games.len())
}

/// Render the CSV into memory, for publishing
pub fn games_to_string(games: &[Game]) -> Result<(String, usize)> {
    let mut buf = Vec::new();
    let count = write_games(&mut buf, games)?;
    // Every field is a Rust `String`, so the output is valid UTF-8
    Ok((String::from_utf8_lossy(&buf).into_owned(), count))
}

/// Write the CSV next to `path` and move it into place once complete
pub fn write_games_file(path: &Path, games: &[Game]) -> Result<usize> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let count = write_games(tmp.as_file_mut(), games)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(count)
}

/// Read games back from an exported CSV
pub fn read_games<R: Read>(reader: R) -> Result<Vec<Game>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut games = Vec::new();
    for record in reader.deserialize() {
        let mut game: Game = record?;
        game.backfill_release_year();
        games.push(game);
    }
    Ok(games)
}

pub fn read_games_file(path: &Path) -> Result<Vec<Game>> {
    read_games(BufReader::new(File::open(path)?))
}
