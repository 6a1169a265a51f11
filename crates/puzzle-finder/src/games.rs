//! Historical game records keyed by their compact remote id.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

use chess_core::{GameRecord, LiveGame};
use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FinderError, Result};

pub const GAME_ID_LEN: usize = 8;

static GAME_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lichess\.org/([a-zA-Z0-9]+)").expect("game url regex"));

/// First eight bytes of a remote game id, zero padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GameId([u8; GAME_ID_LEN]);

impl GameId {
    pub fn new(id: &str) -> Self {
        let mut bytes = [0u8; GAME_ID_LEN];
        for (slot, b) in bytes.iter_mut().zip(id.bytes()) {
            *slot = b;
        }
        Self(bytes)
    }

    /// Extract the id from a game URL such as `https://lichess.org/AbCd1234/black#31`.
    /// Returns the zero id when the URL carries no id.
    pub fn from_url(url: &str) -> Self {
        GAME_URL_REGEX
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| Self::new(m.as_str()))
            .unwrap_or_default()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; GAME_ID_LEN]
    }

    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(GAME_ID_LEN);
        std::str::from_utf8(&self.0[..end]).unwrap_or_default()
    }
}

impl FromStr for GameId {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(FinderError::Format(format!("invalid game id: {s:?}")));
        }
        Ok(Self::new(s))
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concurrent map of game id to recorded moves.
///
/// Shared between search workers; inserts from exports may race and the last
/// write wins. The dirty flag is not persisted.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GamesIndex {
    games: DashMap<GameId, GameRecord>,
    #[serde(skip)]
    dirty: AtomicBool,
}

impl GamesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse move text and store the resulting record.
    pub fn insert(&self, id: GameId, moves: &str) -> Result<()> {
        let record = GameRecord::parse(moves)?;
        self.insert_record(id, record);
        Ok(())
    }

    pub fn insert_game(&self, id: GameId, game: &LiveGame) {
        self.insert_record(id, game.to_record());
    }

    pub fn insert_record(&self, id: GameId, record: GameRecord) {
        self.games.insert(id, record);
        self.dirty.store(true, Ordering::Release);
    }

    /// Stored record for `id`; empty when the game is unknown.
    pub fn lookup(&self, id: &GameId) -> GameRecord {
        self.games
            .get(id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &GameId) -> bool {
        self.games.contains_key(id)
    }

    /// Number of stored records with no moves.
    pub fn empty_records(&self) -> usize {
        self.games.iter().filter(|entry| entry.value().is_empty()).count()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// True once a record was inserted since load or the last `mark_clean`.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    /// Clear the dirty flag, returning whether it was set.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

impl PartialEq for GamesIndex {
    fn eq(&self, other: &Self) -> bool {
        self.games.len() == other.games.len()
            && self.games.iter().all(|entry| {
                other
                    .games
                    .get(entry.key())
                    .is_some_and(|theirs| *theirs.value() == *entry.value())
            })
    }
}
