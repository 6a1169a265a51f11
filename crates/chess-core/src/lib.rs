//! Rules-engine independent chess primitives shared by the puzzle finder:
//! compact moves, piece-placement fingerprints, replayed games and a light
//! PGN reader.

pub mod error;
pub mod game;
pub mod moves;
pub mod pgn;
pub mod position;

pub use error::ChessError;
pub use game::{GameRecord, LiveGame};
pub use moves::{Move, MoveTags, Promotion};
pub use position::{fingerprint, BoardPosition, Fingerprint};
