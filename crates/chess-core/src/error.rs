//! Chess core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    #[error("Invalid SAN '{token}': {reason}")]
    InvalidSan { token: String, reason: String },

    #[error("Illegal move '{token}' at ply {ply}")]
    IllegalMove { token: String, ply: usize },

    #[error("No moves parsed from {0:?}")]
    NoMoves(String),
}
