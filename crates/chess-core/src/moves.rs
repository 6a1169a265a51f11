//! Compact move representation stored in the games index.
//!
//! A stored move is independent of the rules engine: a square pair, an optional
//! promotion piece and a small tag mask. Equality is structural over all four
//! fields.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};
use shakmaty::{uci::UciMove, Chess, Move as ShakMove, Position, Role, Square};

/// Bitmask of move properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MoveTags(u8);

impl MoveTags {
    pub const NONE: MoveTags = MoveTags(0);
    pub const KING_SIDE_CASTLE: MoveTags = MoveTags(1);
    pub const QUEEN_SIDE_CASTLE: MoveTags = MoveTags(1 << 1);
    pub const CAPTURE: MoveTags = MoveTags(1 << 2);
    pub const EN_PASSANT: MoveTags = MoveTags(1 << 3);
    pub const CHECK: MoveTags = MoveTags(1 << 4);

    pub fn contains(self, other: MoveTags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for MoveTags {
    type Output = MoveTags;

    fn bitor(self, rhs: MoveTags) -> MoveTags {
        MoveTags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Promotion {
    #[default]
    None,
    Knight,
    Bishop,
    Rook,
    Queen,
}

impl Promotion {
    fn from_role(role: Option<Role>) -> Self {
        match role {
            Some(Role::Knight) => Promotion::Knight,
            Some(Role::Bishop) => Promotion::Bishop,
            Some(Role::Rook) => Promotion::Rook,
            Some(Role::Queen) => Promotion::Queen,
            _ => Promotion::None,
        }
    }

    fn role(self) -> Option<Role> {
        match self {
            Promotion::None => None,
            Promotion::Knight => Some(Role::Knight),
            Promotion::Bishop => Some(Role::Bishop),
            Promotion::Rook => Some(Role::Rook),
            Promotion::Queen => Some(Role::Queen),
        }
    }

    fn uci_suffix(self) -> &'static str {
        match self {
            Promotion::None => "",
            Promotion::Knight => "n",
            Promotion::Bishop => "b",
            Promotion::Rook => "r",
            Promotion::Queen => "q",
        }
    }
}

/// A played move. Squares are indices `file + rank * 8` (a1 = 0, h8 = 63);
/// castling moves store the king's destination square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Move {
    pub from: u8,
    pub to: u8,
    pub promotion: Promotion,
    pub tags: MoveTags,
}

impl Move {
    /// Convert a move that has just been played; `after` is the resulting
    /// position, needed for the check tag.
    pub fn from_played(mv: &ShakMove, after: &Chess) -> Self {
        let to = match mv.castling_side() {
            Some(side) => side.king_to(!after.turn()),
            None => mv.to(),
        };

        let mut tags = MoveTags::NONE;
        if let Some(side) = mv.castling_side() {
            tags = tags
                | if side.is_king_side() {
                    MoveTags::KING_SIDE_CASTLE
                } else {
                    MoveTags::QUEEN_SIDE_CASTLE
                };
        }
        if mv.is_capture() {
            tags = tags | MoveTags::CAPTURE;
        }
        if mv.is_en_passant() {
            tags = tags | MoveTags::EN_PASSANT;
        }
        if after.is_check() {
            tags = tags | MoveTags::CHECK;
        }

        Self {
            from: mv.from().map(u8::from).unwrap_or_default(),
            to: u8::from(to),
            promotion: Promotion::from_role(mv.promotion()),
            tags,
        }
    }

    /// Resolve this move against `pos` as a UCI move.
    /// Returns None if the move is not legal there.
    pub fn to_legal(&self, pos: &Chess) -> Option<ShakMove> {
        let uci = UciMove::Normal {
            from: Square::try_from(self.from).ok()?,
            to: Square::try_from(self.to).ok()?,
            promotion: self.promotion.role(),
        };
        uci.to_move(pos).ok()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            square(self.from),
            square(self.to),
            self.promotion.uci_suffix()
        )
    }
}

fn square(idx: u8) -> Square {
    Square::new(u32::from(idx.min(63)))
}
