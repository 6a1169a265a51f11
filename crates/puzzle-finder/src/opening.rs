//! Opening names and the fingerprint-keyed openings index.

use std::collections::HashMap;
use std::fmt;

use chess_core::{fingerprint, BoardPosition, ChessError, Fingerprint, LiveGame, Move};
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::Result;

/// Opening family plus an optional variation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OpeningName {
    family: String,
    variation: String,
}

impl OpeningName {
    pub fn new(family: impl Into<String>, variation: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            variation: variation.into(),
        }
    }

    /// Parse a catalog name such as `"Sicilian Defense: Najdorf Variation, English Attack"`.
    /// Anything after the first comma of the variation is dropped.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split(':');
        let family = parts.next().unwrap_or_default().to_string();
        let variation = parts
            .next()
            .map(|v| v.trim().split(',').next().unwrap_or_default().to_string())
            .unwrap_or_default();
        Self { family, variation }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn variation(&self) -> &str {
        &self.variation
    }

    pub fn is_empty(&self) -> bool {
        self.family.is_empty() && self.variation.is_empty()
    }

    pub fn family_tag(&self) -> String {
        sanitize(&self.family)
    }

    pub fn variation_tag(&self) -> String {
        sanitize(&self.variation)
    }

    /// Join key into the puzzles index, e.g. `Kings_Pawn_Open_Game`.
    pub fn tag(&self) -> String {
        let mut tag = self.family_tag();
        if !self.variation.is_empty() {
            tag.push('_');
            tag.push_str(&self.variation_tag());
        }
        tag
    }
}

impl fmt::Display for OpeningName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.family)?;
        if !self.variation.is_empty() {
            write!(f, ": {}", self.variation)?;
        }
        Ok(())
    }
}

fn sanitize(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| *c != '\'')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Result of walking a game's history against the openings index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpeningMatch {
    /// Deepest catalogued opening, empty when none matched.
    pub name: OpeningName,
    /// Ply at which the opening position was reached (0 when not found).
    pub ply: usize,
    /// Moves played after the opening position.
    pub leftover: Vec<Move>,
}

impl OpeningMatch {
    pub fn is_found(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Catalogued opening positions, keyed by placement fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpeningsIndex {
    names: Vec<OpeningName>,
    positions: Vec<BoardPosition>,
    by_fingerprint: HashMap<Fingerprint, usize>,
}

impl OpeningsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            names: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            by_fingerprint: HashMap::with_capacity(capacity),
        }
    }

    /// Replay `moves` and record `name` under the final position.
    /// A later entry reaching the same placement replaces the earlier one.
    pub fn insert(&mut self, name: &str, moves: &str) -> Result<()> {
        let game = LiveGame::from_moves_text(moves)?;
        if game.ply_count() == 0 {
            return Err(ChessError::NoMoves(moves.to_string()).into());
        }

        let id = self.names.len();
        let position = game.board_position();
        self.by_fingerprint.insert(position.fingerprint(), id);
        self.names.push(OpeningName::parse(name));
        self.positions.push(position);

        Ok(())
    }

    pub fn get(&self, key: &Fingerprint) -> Option<&OpeningName> {
        self.by_fingerprint.get(key).map(|&id| &self.names[id])
    }

    /// Opening catalogued at `position`; empty if the position is unknown.
    pub fn lookup(&self, position: &BoardPosition) -> OpeningName {
        self.get(&position.fingerprint()).cloned().unwrap_or_default()
    }

    /// Find the deepest catalogued position in the game's history.
    ///
    /// Walks from the latest position back toward the start. The start
    /// position itself never counts as an opening. When nothing matches, the
    /// whole move list is returned as leftover.
    pub fn resolve(&self, game: &LiveGame) -> OpeningMatch {
        let positions = game.positions();
        for ply in (1..positions.len()).rev() {
            if let Some(name) = self.get(&fingerprint(&positions[ply])) {
                return OpeningMatch {
                    name: name.clone(),
                    ply,
                    leftover: game.moves()[ply..].to_vec(),
                };
            }
        }

        OpeningMatch {
            name: OpeningName::default(),
            ply: 0,
            leftover: game.moves().to_vec(),
        }
    }

    pub fn positions(&self) -> &[BoardPosition] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> OpeningsIndex {
        let mut index = OpeningsIndex::new();
        index.insert("King's Pawn Game", "1. e4").unwrap();
        index.insert("King's Pawn: Open Game", "1. e4 e5").unwrap();
        index
            .insert("Italian Game: Giuoco Piano, Main Line", "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5")
            .unwrap();
        index
    }

    #[test]
    fn test_parse_name() {
        let name = OpeningName::parse("Sicilian Defense: Najdorf Variation, English Attack");
        assert_eq!(name.family(), "Sicilian Defense");
        assert_eq!(name.variation(), "Najdorf Variation");
        assert_eq!(name.to_string(), "Sicilian Defense: Najdorf Variation");

        let bare = OpeningName::parse("Van't Kruijs Opening");
        assert_eq!(bare.variation(), "");
        assert!(!bare.is_empty());
        assert!(OpeningName::parse("").is_empty());
    }

    #[test]
    fn test_tag_normalization() {
        assert_eq!(OpeningName::parse("King's Pawn: Open Game").tag(), "Kings_Pawn_Open_Game");
        assert_eq!(OpeningName::parse("Grünfeld Defense").tag(), "Grunfeld_Defense");
        assert_eq!(
            OpeningName::parse("Réti Opening: King's Indian Attack").tag(),
            "Reti_Opening_Kings_Indian_Attack"
        );
    }

    #[test]
    fn test_insert_rejects_empty_and_bad_moves() {
        let mut index = OpeningsIndex::new();
        assert!(index.insert("Nothing", "").is_err());
        assert!(index.insert("Broken", "1. e5").is_err());
        assert!(index.insert("Lowercase", "1. e4 e5 2. nf3").is_err());
        assert!(index.insert("Garbage", "1. e4 zzz").is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_lookup_exact_position() {
        let index = index();
        let game = LiveGame::from_moves_text("1. e4 e5").unwrap();
        assert_eq!(index.lookup(&game.board_position()).to_string(), "King's Pawn: Open Game");

        let unknown = LiveGame::from_moves_text("1. a3").unwrap();
        assert!(index.lookup(&unknown.board_position()).is_empty());
    }

    #[test]
    fn test_resolve_deepest_match_and_leftover() {
        let index = index();
        let game = LiveGame::from_moves_text("1. e4 e5 2. Nc3 Nf6").unwrap();
        let found = index.resolve(&game);
        assert_eq!(found.name.tag(), "Kings_Pawn_Open_Game");
        assert_eq!(found.ply, 2);
        assert_eq!(found.leftover, game.moves()[2..].to_vec());
    }

    #[test]
    fn test_resolve_transposition() {
        let index = index();
        let game = LiveGame::from_moves_text("1. e4 e5 2. Bc4 Bc5 3. Nf3 Nc6").unwrap();
        let found = index.resolve(&game);
        assert_eq!(found.name.family(), "Italian Game");
        assert!(found.leftover.is_empty());
    }

    #[test]
    fn test_resolve_nothing_found() {
        let index = index();
        let game = LiveGame::from_moves_text("1. d4 d5").unwrap();
        let found = index.resolve(&game);
        assert!(!found.is_found());
        assert_eq!(found.leftover.len(), 2);

        let empty = LiveGame::new();
        assert!(!index.resolve(&empty).is_found());
    }
}
