pub mod lichess;

use async_trait::async_trait;
use chess_core::GameRecord;

use crate::error::ExportError;
use crate::games::GameId;

pub use lichess::LichessClient;

/// Most game ids accepted by a single export request.
pub const MAX_EXPORT_GAMES: usize = 300;

/// Remote source of historical game records.
#[async_trait]
pub trait GameExporter: Send + Sync {
    /// Export up to [`MAX_EXPORT_GAMES`] games in one round trip.
    ///
    /// Games the remote does not return, or returns in an unreadable form, are
    /// simply absent from the result.
    async fn export_games(&self, ids: &[GameId]) -> Result<Vec<(GameId, GameRecord)>, ExportError>;
}
