//! Finder error types

use std::path::PathBuf;

use chess_core::ChessError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinderError {
    #[error("Parse error: {0}")]
    Parse(#[from] ChessError),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Failed to load index {path:?}: {reason}")]
    IndexLoad { path: PathBuf, reason: String },

    #[error("Failed to save index {path:?}: {reason}")]
    IndexSave { path: PathBuf, reason: String },

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failure of one game-export round trip. The whole batch is affected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Request error: {0}")]
    Transport(String),

    #[error("Unexpected response: HTTP {0}")]
    Status(u16),

    #[error("Rate limited after {0} attempts")]
    RateLimited(u32),

    #[error("Failed to decode export: {0}")]
    Decode(String),

    #[error("Export cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, FinderError>;
