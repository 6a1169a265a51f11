//! Finder configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::clients::MAX_EXPORT_GAMES;
use crate::error::{FinderError, Result};
use crate::search::Verification;

pub const DEFAULT_LICHESS_URL: &str = "https://lichess.org";

#[derive(Clone, Debug)]
pub struct FinderConfig {
    /// Directory holding the serialized indexes
    pub index_dir: PathBuf,

    /// Raw opening TSV files and the puzzle dump used by the index builder
    pub database_dir: PathBuf,

    /// Base URL of the game site
    pub lichess_url: String,

    /// Game ids per export request
    pub export_batch: usize,

    /// Minimum spacing between export requests
    pub export_interval: Duration,

    /// Wait after an HTTP 429
    pub rate_limit_backoff: Duration,

    /// Attempts per export request while rate limited
    pub export_attempts: u32,

    /// Verification worker count
    pub workers: usize,

    pub verification: Verification,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("data"),
            database_dir: PathBuf::from("data/database"),
            lichess_url: DEFAULT_LICHESS_URL.to_string(),
            export_batch: MAX_EXPORT_GAMES,
            export_interval: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(60),
            export_attempts: 3,
            workers: num_cpus::get(),
            verification: Verification::Moves,
        }
    }
}

impl FinderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup; unset keys take their defaults.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| var(key).and_then(|v| v.trim().parse::<u64>().ok());

        let verification = match var("COPS_VERIFY") {
            Some(v) => v
                .parse()
                .map_err(|_| FinderError::Config("COPS_VERIFY must be `moves` or `position`"))?,
            None => defaults.verification,
        };

        Ok(Self {
            index_dir: var("COPS_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_dir),
            database_dir: var("COPS_DATABASE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_dir),
            lichess_url: var("LICHESS_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.lichess_url),
            export_batch: parsed("COPS_EXPORT_BATCH")
                .map(|n| (n as usize).clamp(1, MAX_EXPORT_GAMES))
                .unwrap_or(defaults.export_batch),
            export_interval: parsed("COPS_EXPORT_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.export_interval),
            rate_limit_backoff: parsed("COPS_RATE_LIMIT_BACKOFF_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_backoff),
            export_attempts: parsed("COPS_EXPORT_ATTEMPTS")
                .map(|n| n.clamp(1, u32::MAX as u64) as u32)
                .unwrap_or(defaults.export_attempts),
            workers: parsed("COPS_WORKERS")
                .filter(|&n| n > 0)
                .map(|n| n as usize)
                .unwrap_or(defaults.workers),
            verification,
        })
    }
}
