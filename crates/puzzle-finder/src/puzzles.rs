//! Puzzle records and the tag-bucketed puzzles index.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FinderError, Result};
use crate::games::GameId;

pub const PUZZLE_ID_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PuzzleId([u8; PUZZLE_ID_LEN]);

impl PuzzleId {
    pub fn new(id: &str) -> Self {
        let mut bytes = [0u8; PUZZLE_ID_LEN];
        for (slot, b) in bytes.iter_mut().zip(id.bytes()) {
            *slot = b;
        }
        Self(bytes)
    }

    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(PUZZLE_ID_LEN);
        std::str::from_utf8(&self.0[..end]).unwrap_or_default()
    }
}

impl fmt::Display for PuzzleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Parse a FEN side-to-move field.
    pub fn from_fen_field(field: &str) -> Option<Self> {
        match field {
            "w" => Some(Side::White),
            "b" => Some(Side::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("white"),
            Side::Black => f.write_str("black"),
        }
    }
}

impl FromStr for Side {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "w" | "white" => Ok(Side::White),
            "b" | "black" => Ok(Side::Black),
            _ => Err(FinderError::Format(format!("invalid side: {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PuzzleRecord {
    /// Full-move number of the puzzle position.
    pub move_number: u16,
    /// Side that solves the puzzle.
    pub side: Side,
    pub id: PuzzleId,
    pub game_id: GameId,
}

impl PuzzleRecord {
    /// Build a record from a puzzle row.
    ///
    /// The FEN is the position before the opponent's setup move, so the solving
    /// side is the inverse of its side-to-move field.
    pub fn new(id: &str, fen: &str, game_url: &str) -> Result<Self> {
        let fields: Vec<&str> = fen.split(' ').collect();
        if fields.len() != 6 {
            return Err(FinderError::Format(format!(
                "FEN must have 6 fields, got {}: {fen:?}",
                fields.len()
            )));
        }

        let to_move = Side::from_fen_field(fields[1])
            .ok_or_else(|| FinderError::Format(format!("invalid side to move: {:?}", fields[1])))?;
        let move_number = fields[5]
            .parse::<u16>()
            .map_err(|e| FinderError::Format(format!("invalid move number {:?}: {e}", fields[5])))?;

        Ok(Self {
            move_number,
            side: to_move.opposite(),
            id: PuzzleId::new(id),
            game_id: GameId::from_url(game_url),
        })
    }
}

/// Flat puzzle records plus tag buckets of record indices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PuzzlesIndex {
    collection: Vec<PuzzleRecord>,
    by_tag: HashMap<String, Vec<usize>>,
}

impl PuzzlesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a puzzle under every whitespace-separated tag in `tags`.
    pub fn insert(&mut self, id: &str, fen: &str, game_url: &str, tags: &str) -> Result<()> {
        let record = PuzzleRecord::new(id, fen, game_url)?;
        let idx = self.collection.len();
        self.collection.push(record);

        for tag in tags.split_whitespace() {
            self.by_tag.entry(tag.to_string()).or_default().push(idx);
        }

        Ok(())
    }

    /// Lazily walk the bucket for `tag` in insertion order, keeping records
    /// for `side` (`None` accepts both) with a move number no greater than
    /// `max_move_number`.
    pub fn search<'a>(
        &'a self,
        tag: &str,
        side: Option<Side>,
        max_move_number: u32,
    ) -> impl Iterator<Item = &'a PuzzleRecord> + 'a {
        self.bucket(tag)
            .iter()
            .map(move |&idx| &self.collection[idx])
            .filter(move |record| {
                side.is_none_or(|s| record.side == s)
                    && u32::from(record.move_number) <= max_move_number
            })
    }

    pub fn bucket(&self, tag: &str) -> &[usize] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn records(&self) -> &[PuzzleRecord] {
        &self.collection
    }

    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}
