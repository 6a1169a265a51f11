//! The three persisted indexes, loaded together at start-up.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::Result;
use crate::games::GamesIndex;
use crate::opening::OpeningsIndex;
use crate::persist::{load_index, save_index};
use crate::puzzles::PuzzlesIndex;

pub const OPENINGS_INDEX_FILE: &str = "openings.index";
pub const GAMES_INDEX_FILE: &str = "games.index";
pub const PUZZLES_INDEX_FILE: &str = "puzzles.index";

/// Shared handles to the loaded indexes. Only the games index is mutated
/// after load.
#[derive(Debug, Clone, Default)]
pub struct Indexes {
    pub openings: Arc<OpeningsIndex>,
    pub games: Arc<GamesIndex>,
    pub puzzles: Arc<PuzzlesIndex>,
}

impl Indexes {
    pub fn new(openings: OpeningsIndex, games: GamesIndex, puzzles: PuzzlesIndex) -> Self {
        Self {
            openings: Arc::new(openings),
            games: Arc::new(games),
            puzzles: Arc::new(puzzles),
        }
    }

    /// Load all three index files from `dir`. Any failure is fatal.
    pub fn load(dir: &Path) -> Result<Self> {
        let openings: OpeningsIndex = timed_load(dir, OPENINGS_INDEX_FILE)?;
        info!(openings = openings.len(), "Loaded openings index");

        let games: GamesIndex = timed_load(dir, GAMES_INDEX_FILE)?;
        info!(games = games.len(), "Loaded games index");
        let empty = games.empty_records();
        if empty > 0 {
            warn!(empty, "Games index holds records without moves");
        }

        let puzzles: PuzzlesIndex = timed_load(dir, PUZZLES_INDEX_FILE)?;
        info!(puzzles = puzzles.len(), tags = puzzles.tag_count(), "Loaded puzzles index");

        Ok(Self::new(openings, games, puzzles))
    }

    /// Persist the games index if it changed since load. Returns whether a
    /// file was written.
    pub fn save_games(&self, dir: &Path) -> Result<bool> {
        // cleared before writing so inserts racing the save stay dirty
        if !self.games.take_dirty() {
            return Ok(false);
        }
        if let Err(e) = save_index(self.games.as_ref(), dir.join(GAMES_INDEX_FILE)) {
            self.games.mark_dirty();
            return Err(e);
        }
        info!(games = self.games.len(), "Saved games index");
        Ok(true)
    }

    pub fn save_all(&self, dir: &Path) -> Result<()> {
        save_index(self.openings.as_ref(), dir.join(OPENINGS_INDEX_FILE))?;
        save_index(self.puzzles.as_ref(), dir.join(PUZZLES_INDEX_FILE))?;
        let was_dirty = self.games.take_dirty();
        if let Err(e) = save_index(self.games.as_ref(), dir.join(GAMES_INDEX_FILE)) {
            if was_dirty {
                self.games.mark_dirty();
            }
            return Err(e);
        }
        Ok(())
    }
}

fn timed_load<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let start = Instant::now();
    let index = load_index(dir.join(file))?;
    info!(file, took_ms = start.elapsed().as_millis() as u64, "Index file read");
    Ok(index)
}
