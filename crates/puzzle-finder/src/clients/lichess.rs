use std::time::Duration;

use async_trait::async_trait;
use chess_core::{pgn, GameRecord};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use super::{GameExporter, MAX_EXPORT_GAMES};
use crate::config::{FinderConfig, DEFAULT_LICHESS_URL};
use crate::error::ExportError;
use crate::games::GameId;
use crate::puzzles::PuzzleRecord;

/// Training page of a puzzle on the public site.
pub fn puzzle_url(record: &PuzzleRecord) -> String {
    format!("{DEFAULT_LICHESS_URL}/training/{}", record.id)
}

/// Source game of a puzzle on the public site.
pub fn game_url(record: &PuzzleRecord) -> String {
    format!("{DEFAULT_LICHESS_URL}/{}", record.game_id)
}

pub struct LichessClient {
    client: Client,
    base_url: String,
    limiter: Option<DefaultDirectRateLimiter>,
    backoff: Duration,
    attempts: u32,
}

impl LichessClient {
    pub fn new(config: &FinderConfig) -> Result<Self, ExportError> {
        let client = Client::builder()
            .user_agent(concat!("cops/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.lichess_url.clone(),
            limiter: Quota::with_period(config.export_interval).map(RateLimiter::direct),
            backoff: config.rate_limit_backoff,
            attempts: config.export_attempts.max(1),
        })
    }

    /// POST the id list, waiting out the rate limiter and retrying on 429.
    async fn post_ids(&self, body: String) -> Result<Response, ExportError> {
        let url = format!("{}/games/export/_ids", self.base_url);

        for attempt in 1..=self.attempts {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            debug!(%url, attempt, "Lichess export request");
            let resp = self
                .client
                .post(&url)
                .header(ACCEPT, "application/x-chess-pgn")
                .body(body.clone())
                .send()
                .await
                .map_err(|e| ExportError::Transport(e.to_string()))?;
            debug!(status = %resp.status(), "Lichess export responded");

            if resp.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(resp);
            }

            warn!(attempt, backoff_secs = self.backoff.as_secs(), "Lichess rate limit hit");
            if attempt < self.attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }

        Err(ExportError::RateLimited(self.attempts))
    }
}

#[async_trait]
impl GameExporter for LichessClient {
    async fn export_games(&self, ids: &[GameId]) -> Result<Vec<(GameId, GameRecord)>, ExportError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_EXPORT_GAMES {
            return Err(ExportError::Decode(format!(
                "can't export more than {MAX_EXPORT_GAMES} games, got {}",
                ids.len()
            )));
        }

        let body = ids.iter().map(GameId::as_str).collect::<Vec<_>>().join(",");
        let resp = self.post_ids(body).await?;

        if !resp.status().is_success() {
            return Err(ExportError::Status(resp.status().as_u16()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| ExportError::Decode(e.to_string()))?;

        Ok(parse_export(&text))
    }
}

/// Parse a multi-game PGN export body.
///
/// Games with a custom start position, without an id, or with unreadable
/// moves are skipped.
pub fn parse_export(body: &str) -> Vec<(GameId, GameRecord)> {
    let mut games = Vec::new();

    for game in pgn::split_games(body) {
        let id = pgn::extract_header(game, "GameId")
            .map(|id| GameId::new(&id))
            .or_else(|| pgn::extract_header(game, "Site").map(|site| GameId::from_url(&site)))
            .filter(|id| !id.is_zero());
        let Some(id) = id else {
            warn!("Exported game has no id, skipping");
            continue;
        };

        if !pgn::has_standard_start(game) {
            debug!(game_id = %id, "Skipping game with custom start position");
            continue;
        }

        match GameRecord::parse(game) {
            Ok(record) => games.push((id, record)),
            Err(e) => warn!(game_id = %id, "Failed to parse exported game: {e}"),
        }
    }

    games
}
