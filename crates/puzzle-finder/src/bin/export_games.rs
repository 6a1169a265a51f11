//! Export every puzzle source game missing from the games index.
//!
//! Usage: cargo run --release --bin export-games
//!
//! Games are fetched in batches through the rate-limited Lichess client and
//! the games index is saved after each batch, so the tool can be stopped and
//! resumed.

use std::collections::BTreeSet;
use std::time::Instant;

use puzzle_finder::{FinderConfig, GameExporter, GameId, Indexes, LichessClient};
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = FinderConfig::from_env()?;
    let indexes = Indexes::load(&config.index_dir)?;
    let client = LichessClient::new(&config)?;

    let missing: Vec<GameId> = indexes
        .puzzles
        .records()
        .iter()
        .map(|puzzle| puzzle.game_id)
        .filter(|id| !id.is_zero() && !indexes.games.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let total = missing.len();
    println!("{} games to export in batches of {}", total, config.export_batch);

    let start = Instant::now();
    let mut done = 0usize;
    let mut exported = 0usize;

    for batch in missing.chunks(config.export_batch) {
        match client.export_games(batch).await {
            Ok(games) => {
                exported += games.len();
                for (id, record) in games {
                    indexes.games.insert_record(id, record);
                }
                indexes.save_games(&config.index_dir)?;
            }
            Err(e) => warn!(games = batch.len(), "Export failed, skipping batch: {e}"),
        }

        done += batch.len();
        let elapsed = start.elapsed().as_secs().max(1);
        println!(
            "  {:>8}/{} requested, {:>8} exported ({}s, {} games/s)",
            done,
            total,
            exported,
            elapsed,
            exported as u64 / elapsed
        );
    }

    println!();
    println!("Done! {} games now indexed", indexes.games.len());

    Ok(())
}
