//! Build the openings and puzzles indexes from the reference data.
//!
//! Usage: cargo run --release --bin build-indexes
//!
//! Reads `a.tsv` .. `e.tsv` and `puzzles.csv.zst` from COPS_DATABASE_DIR and
//! writes the index files into COPS_INDEX_DIR. An empty games index is created
//! when none exists yet.

use std::fs;
use std::time::Instant;

use puzzle_finder::build::{build_openings, build_puzzles, PUZZLES_DUMP_FILE};
use puzzle_finder::indexes::{GAMES_INDEX_FILE, OPENINGS_INDEX_FILE, PUZZLES_INDEX_FILE};
use puzzle_finder::persist::save_index;
use puzzle_finder::{FinderConfig, GamesIndex};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = FinderConfig::from_env()?;
    let start = Instant::now();

    println!("Building openings index from {}...", config.database_dir.display());
    let openings = build_openings(&config.database_dir)?;
    let openings_path = config.index_dir.join(OPENINGS_INDEX_FILE);
    save_index(&openings, &openings_path)?;
    println!("  Openings: {}", openings.len());

    let dump = config.database_dir.join(PUZZLES_DUMP_FILE);
    println!("Building puzzles index from {}...", dump.display());
    let puzzles = build_puzzles(&dump)?;
    let puzzles_path = config.index_dir.join(PUZZLES_INDEX_FILE);
    save_index(&puzzles, &puzzles_path)?;
    println!("  Puzzles: {}", puzzles.len());
    println!("  Tags:    {}", puzzles.tag_count());

    let games_path = config.index_dir.join(GAMES_INDEX_FILE);
    if !games_path.exists() {
        println!("Creating empty games index...");
        save_index(&GamesIndex::new(), &games_path)?;
    }

    println!();
    println!("Done in {:.1}s", start.elapsed().as_secs_f64());
    for path in [&openings_path, &puzzles_path, &games_path] {
        let size = fs::metadata(path)?.len();
        println!("  {} ({} KB)", path.display(), size / 1024);
    }

    Ok(())
}
