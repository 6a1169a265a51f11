//! Opening puzzle finder CLI
//!
//! Usage: puzzle-finder "<moves>" <w|b|n> <max-moves>
//!
//! Resolves the opening of the given move text and prints every puzzle whose
//! source game continues it. Ctrl-C stops the search.

use std::sync::Arc;

use anyhow::{bail, Context};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chess_core::LiveGame;
use puzzle_finder::clients::lichess::{game_url, puzzle_url};
use puzzle_finder::{FinderConfig, Indexes, LichessClient, SearchEngine, SearchOptions, Side};

const USAGE: &str = "usage: puzzle-finder \"<moves>\" <w|b|n> <max-moves>";

struct Args {
    moves: String,
    side: Option<Side>,
    max_moves: u32,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 3 {
        bail!(USAGE);
    }

    let side = match args[1].as_str() {
        "n" | "either" => None,
        other => Some(other.parse::<Side>().context(USAGE)?),
    };
    let max_moves = args[2]
        .parse()
        .with_context(|| format!("invalid max-moves {:?}", args[2]))?;

    Ok(Args {
        moves: args[0].clone(),
        side,
        max_moves,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let args = parse_args()?;
    let config = FinderConfig::from_env()?;

    let game = LiveGame::from_moves_text(&args.moves).context("failed to parse moves")?;
    let indexes = Indexes::load(&config.index_dir)?;
    let client = LichessClient::new(&config)?;
    let engine = SearchEngine::new(&indexes, Arc::new(client), SearchOptions::from(&config));

    let opening = engine.resolve_opening(&game);
    if !opening.is_found() {
        println!("No known opening for these moves");
        return Ok(());
    }
    println!("Opening: {} ({} moves after it)", opening.name, opening.leftover.len());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping search");
            ctrl_c.cancel();
        }
    });

    let mut puzzles = engine.search_puzzles_with_cancel(&game, args.side, args.max_moves, cancel);
    while let Some(puzzle) = puzzles.next().await {
        println!(
            "{}  move {:>3}  {:<5}  {}",
            puzzle_url(&puzzle),
            puzzle.move_number,
            puzzle.side.to_string(),
            game_url(&puzzle)
        );
    }

    let stats = puzzles.finish().await;
    println!();
    println!("Found {} of {} candidates", stats.found, stats.candidates);
    if stats.dropped > 0 {
        warn!(dropped = stats.dropped, "Some candidates could not be verified");
    }

    if indexes.save_games(&config.index_dir)? {
        println!("Saved {} exported games", stats.exported);
    }

    Ok(())
}
