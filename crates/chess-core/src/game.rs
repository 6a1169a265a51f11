//! Live games (replayed with the rules engine) and stored game records.

use serde::{Deserialize, Serialize};
use shakmaty::{san::SanPlus, Chess, Move as ShakMove, Position};

use crate::error::ChessError;
use crate::moves::Move;
use crate::pgn;
use crate::position::{fingerprint, BoardPosition};

/// A game replayed from the standard start position.
///
/// Keeps every visited position, initial position first, so that
/// `positions().len() == moves().len() + 1`.
#[derive(Debug, Clone)]
pub struct LiveGame {
    positions: Vec<Chess>,
    moves: Vec<Move>,
}

impl Default for LiveGame {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveGame {
    pub fn new() -> Self {
        Self {
            positions: vec![Chess::default()],
            moves: Vec::new(),
        }
    }

    /// Parse PGN movetext (or a full PGN) and replay it.
    pub fn from_moves_text(text: &str) -> Result<Self, ChessError> {
        let mut game = Self::new();
        for token in pgn::extract_moves(text) {
            game.play_san(&token)?;
        }
        Ok(game)
    }

    /// Play a SAN move on the current position.
    pub fn play_san(&mut self, token: &str) -> Result<(), ChessError> {
        let san: SanPlus = token.parse().map_err(|e| ChessError::InvalidSan {
            token: token.to_string(),
            reason: format!("{e}"),
        })?;
        let mv = san
            .san
            .to_move(self.position())
            .map_err(|_| ChessError::IllegalMove {
                token: token.to_string(),
                ply: self.moves.len() + 1,
            })?;
        self.play(&mv);
        Ok(())
    }

    /// Play a move already known to be legal in the current position.
    pub fn play(&mut self, mv: &ShakMove) {
        let mut next = self.position().clone();
        next.play_unchecked(mv.clone());
        self.moves.push(Move::from_played(mv, &next));
        self.positions.push(next);
    }

    pub fn position(&self) -> &Chess {
        // positions always holds at least the start position
        &self.positions[self.positions.len() - 1]
    }

    pub fn board_position(&self) -> BoardPosition {
        BoardPosition::from_chess(self.position())
    }

    pub fn positions(&self) -> &[Chess] {
        &self.positions
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    pub fn to_record(&self) -> GameRecord {
        GameRecord::from(self.moves.clone())
    }
}

/// Moves of a historical game. An empty record means "not indexed".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameRecord {
    moves: Vec<Move>,
}

impl From<Vec<Move>> for GameRecord {
    fn from(moves: Vec<Move>) -> Self {
        Self { moves }
    }
}

impl GameRecord {
    /// Parse and replay move text into a record.
    pub fn parse(text: &str) -> Result<Self, ChessError> {
        Ok(LiveGame::from_moves_text(text)?.to_record())
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// True if `target` appears in this record as a contiguous run.
    ///
    /// The scan starts matching at the first occurrence of `target[0]`; once a
    /// match has started, any mismatch fails the whole check rather than
    /// restarting the search. Move numbers are not compared.
    pub fn contains_moves(&self, target: &[Move]) -> bool {
        if target.is_empty() {
            return true;
        }

        // TODO: compare move numbers once records keep their starting ply
        let mut matched = 0;
        for mv in &self.moves {
            if *mv == target[matched] {
                matched += 1;
                if matched == target.len() {
                    return true;
                }
            } else if matched > 0 {
                return false;
            }
        }

        false
    }

    /// True if replaying this record from the start reaches a position with the
    /// same piece placement as `target`. A move that cannot be replayed ends the
    /// check as a mismatch.
    pub fn contains_position(&self, target: &BoardPosition) -> bool {
        if target.is_empty() {
            return true;
        }

        let wanted = target.fingerprint();
        let mut pos = Chess::default();
        for mv in &self.moves {
            let Some(legal) = mv.to_legal(&pos) else {
                return false;
            };
            pos.play_unchecked(legal);
            if fingerprint(&pos) == wanted {
                return true;
            }
        }

        false
    }
}
