//! Opening puzzle finder.
//!
//! Finds training puzzles whose source game continues a given opening line,
//! using pre-built openings, games and puzzles indexes and falling back to the
//! Lichess game export for games not yet indexed.

pub mod build;
pub mod clients;
pub mod config;
pub mod error;
pub mod games;
pub mod indexes;
pub mod opening;
pub mod persist;
pub mod puzzles;
pub mod search;

pub use clients::{GameExporter, LichessClient, MAX_EXPORT_GAMES};
pub use config::FinderConfig;
pub use error::{ExportError, FinderError, Result};
pub use games::{GameId, GamesIndex};
pub use indexes::Indexes;
pub use opening::{OpeningMatch, OpeningName, OpeningsIndex};
pub use puzzles::{PuzzleId, PuzzleRecord, PuzzlesIndex, Side};
pub use search::{PuzzleStream, SearchEngine, SearchOptions, SearchStats, Verification};
