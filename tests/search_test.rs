//! End-to-end puzzle search over in-memory indexes.
//!
//! Run with: cargo test --test search_test

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chess_core::LiveGame;
use common::*;
use futures::StreamExt;
use puzzle_finder::{GameId, Indexes, PuzzleId, PuzzlesIndex, Side, Verification};
use tokio_util::sync::CancellationToken;

const SOURCE_GAME: &str = "game0001";
const SOURCE_MOVES: &str = "1. e4 e5 2. Nf3";

fn known_game_indexes() -> Indexes {
    Indexes::new(openings(), games(&[(SOURCE_GAME, SOURCE_MOVES)]), single_puzzle(SOURCE_GAME))
}

#[tokio::test]
async fn test_resolve_opening() {
    let indexes = known_game_indexes();
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(2));

    let game = LiveGame::from_moves_text("1. e4 e5 2. Nc3 Nf6").unwrap();
    let opening = engine.resolve_opening(&game);
    assert_eq!(opening.name.to_string(), OPEN_GAME);
    assert_eq!(opening.leftover.len(), 2);
}

#[tokio::test]
async fn test_matching_continuation_yields_puzzle() {
    let indexes = known_game_indexes();
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(2));

    let found = collect(&engine, "1. e4 e5", Some(Side::White), 5).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, PuzzleId::new("00001"));
    assert_eq!(found[0].game_id, GameId::new(SOURCE_GAME));
}

#[tokio::test]
async fn test_diverging_continuation_is_rejected() {
    let indexes = known_game_indexes();
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(2));

    let found = collect(&engine, "1. e4 e5 2. Nc3", Some(Side::White), 5).await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_wrong_side_is_empty() {
    let indexes = known_game_indexes();
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(2));

    let found = collect(&engine, "1. e4 e5", Some(Side::Black), 5).await;
    assert!(found.is_empty());

    let either = collect(&engine, "1. e4 e5", None, 5).await;
    assert_eq!(either.len(), 1);
}

#[tokio::test]
async fn test_move_ceiling_counts_from_opening() {
    let indexes = known_game_indexes();
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(1));

    // opening ends after move 1, so two more moves reach move 3
    assert_eq!(collect(&engine, "1. e4 e5", None, 2).await.len(), 1);
    assert!(collect(&engine, "1. e4 e5", None, 1).await.is_empty());
}

#[tokio::test]
async fn test_unknown_opening_is_empty() {
    let indexes = known_game_indexes();
    let exporter = Arc::new(MockExporter::default());
    let engine = engine(&indexes, Arc::clone(&exporter), options(2));

    assert!(collect(&engine, "1. d4 d5", None, 50).await.is_empty());
    assert!(collect(&engine, "", None, 50).await.is_empty());
    assert_eq!(exporter.calls(), 0);
}

#[tokio::test]
async fn test_empty_bucket_is_empty() {
    let indexes = Indexes::new(openings(), games(&[]), PuzzlesIndex::new());
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(2));

    assert!(collect(&engine, "1. e4 e5", None, 50).await.is_empty());
}

#[tokio::test]
async fn test_unknown_game_is_exported_and_inserted() {
    let indexes = Indexes::new(openings(), games(&[]), single_puzzle(SOURCE_GAME));
    let exporter = Arc::new(MockExporter::with_games(&[(SOURCE_GAME, SOURCE_MOVES)]));
    let engine = engine(&indexes, Arc::clone(&exporter), options(2));

    let found = collect(&engine, "1. e4 e5 2. Nf3", Some(Side::White), 5).await;
    assert_eq!(found.len(), 1);
    assert_eq!(exporter.calls(), 1);
    assert_eq!(indexes.games.lookup(&GameId::new(SOURCE_GAME)).len(), 3);
    assert!(indexes.games.is_dirty());

    // now indexed, no further export
    let again = collect(&engine, "1. e4 e5 2. Nf3", Some(Side::White), 5).await;
    assert_eq!(again.len(), 1);
    assert_eq!(exporter.calls(), 1);
}

#[tokio::test]
async fn test_failed_export_drops_batch() {
    let indexes = Indexes::new(openings(), games(&[]), single_puzzle(SOURCE_GAME));
    let exporter = Arc::new(MockExporter::failing());
    let engine = engine(&indexes, Arc::clone(&exporter), options(2));

    let game = LiveGame::from_moves_text("1. e4 e5 2. Nf3").unwrap();
    let mut stream = engine.search_puzzles(&game, Some(Side::White), 5);
    assert!(stream.next().await.is_none());

    let stats = stream.finish().await;
    assert_eq!(stats.candidates, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.found, 0);
    assert!(!stats.cancelled);
    assert_eq!(exporter.calls(), 1);
    assert!(indexes.games.is_empty());
}

#[tokio::test]
async fn test_exports_are_batched() {
    let indexes = Indexes::new(openings(), games(&[]), many_puzzles(5));
    let entries: Vec<(String, &str)> = (0..5).map(|i| (game_name(i), SOURCE_MOVES)).collect();
    let entries: Vec<(&str, &str)> = entries.iter().map(|(id, m)| (id.as_str(), *m)).collect();
    let exporter = Arc::new(MockExporter::with_games(&entries));
    let mut opts = options(3);
    opts.batch_size = 2;
    let engine = engine(&indexes, Arc::clone(&exporter), opts);

    let found = collect(&engine, "1. e4 e5 2. Nf3", None, 10).await;
    assert_eq!(found.len(), 5);
    assert_eq!(exporter.calls(), 3);
    assert_eq!(exporter.requested(), 5);
}

#[tokio::test]
async fn test_puzzles_sharing_a_game_export_it_once() {
    let mut puzzles = single_puzzle(SOURCE_GAME);
    puzzles
        .insert("00002", WHITE_SOLVES_FEN, &game_url(SOURCE_GAME), OPEN_GAME_TAG)
        .unwrap();
    let indexes = Indexes::new(openings(), games(&[]), puzzles);
    let exporter = Arc::new(MockExporter::with_games(&[(SOURCE_GAME, SOURCE_MOVES)]));
    let engine = engine(&indexes, Arc::clone(&exporter), options(2));

    let found = collect(&engine, "1. e4 e5", None, 10).await;
    assert_eq!(found.len(), 2);
    assert_eq!(exporter.requested(), 1);
}

#[tokio::test]
async fn test_repeated_runs_return_same_set() {
    let count = 64;
    let entries: Vec<(String, &str)> = (0..count)
        .map(|i| {
            let moves = if i % 3 == 0 { "1. e4 e5 2. Nc3" } else { SOURCE_MOVES };
            (game_name(i), moves)
        })
        .collect();
    let entries: Vec<(&str, &str)> = entries.iter().map(|(id, m)| (id.as_str(), *m)).collect();
    let indexes = Indexes::new(openings(), games(&entries), many_puzzles(count));
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(4));

    let first: HashSet<PuzzleId> = collect(&engine, "1. e4 e5 2. Nf3", None, 10)
        .await
        .into_iter()
        .map(|p| p.id)
        .collect();
    let second: HashSet<PuzzleId> = collect(&engine, "1. e4 e5 2. Nf3", None, 10)
        .await
        .into_iter()
        .map(|p| p.id)
        .collect();

    assert_eq!(first.len(), count - count.div_ceil(3));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_position_verification_accepts_transposition() {
    let indexes = Indexes::new(
        openings(),
        games(&[(SOURCE_GAME, "1. Nf3 e5 2. e4 Nc6")]),
        single_puzzle(SOURCE_GAME),
    );
    let mut opts = options(2);
    opts.verification = Verification::Position;
    let engine = engine(&indexes, Arc::new(MockExporter::default()), opts);

    assert_eq!(collect(&engine, "1. e4 e5 2. Nf3 Nc6", None, 10).await.len(), 1);

    let mut by_moves = options(2);
    by_moves.verification = Verification::Moves;
    let strict = common::engine(&indexes, Arc::new(MockExporter::default()), by_moves);
    assert!(collect(&strict, "1. e4 e5 2. Nf3 Nc6", None, 10).await.is_empty());
}

#[tokio::test]
async fn test_cancel_stops_pending_export() {
    let indexes = Indexes::new(openings(), games(&[]), single_puzzle(SOURCE_GAME));
    let exporter = Arc::new(MockExporter::slow(Duration::from_secs(3600)));
    let engine = engine(&indexes, Arc::clone(&exporter), options(2));

    let cancel = CancellationToken::new();
    let game = LiveGame::from_moves_text("1. e4 e5").unwrap();
    let mut stream = engine.search_puzzles_with_cancel(&game, None, 10, cancel.clone());

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let next = tokio::time::timeout(Duration::from_secs(10), stream.next())
        .await
        .expect("search did not stop after cancellation");
    assert!(next.is_none());

    let stats = stream.finish().await;
    assert!(stats.cancelled);
    assert_eq!(stats.found, 0);
}

#[tokio::test]
async fn test_early_stop_short_circuits() {
    let count = 200;
    let entries: Vec<(String, &str)> = (0..count).map(|i| (game_name(i), SOURCE_MOVES)).collect();
    let entries: Vec<(&str, &str)> = entries.iter().map(|(id, m)| (id.as_str(), *m)).collect();
    let indexes = Indexes::new(openings(), games(&entries), many_puzzles(count));
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(2));

    let game = LiveGame::from_moves_text("1. e4 e5").unwrap();
    let mut stream = engine.search_puzzles(&game, None, 10);
    assert!(stream.next().await.is_some());

    stream.cancel();
    let stats = tokio::time::timeout(Duration::from_secs(10), stream.finish())
        .await
        .expect("search did not stop");
    assert!(stats.cancelled);
    assert!(stats.found < count);
}

#[tokio::test]
async fn test_dropping_stream_leaves_caller_token_alone() {
    let indexes = known_game_indexes();
    let engine = engine(&indexes, Arc::new(MockExporter::default()), options(2));

    let cancel = CancellationToken::new();
    let game = LiveGame::from_moves_text("1. e4 e5").unwrap();
    let stream = engine.search_puzzles_with_cancel(&game, None, 10, cancel.clone());
    drop(stream);

    assert!(!cancel.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_insert_same_game_once() {
    let indexes = Indexes::new(openings(), games(&[]), single_puzzle(SOURCE_GAME));
    let first = Arc::new(MockExporter::with_games(&[(SOURCE_GAME, SOURCE_MOVES)]));
    let second = Arc::new(MockExporter::with_games(&[(SOURCE_GAME, SOURCE_MOVES)]));
    let a = engine(&indexes, Arc::clone(&first), options(2));
    let b = engine(&indexes, Arc::clone(&second), options(2));

    let (found_a, found_b) = tokio::join!(
        collect(&a, "1. e4 e5 2. Nf3", Some(Side::White), 5),
        collect(&b, "1. e4 e5 2. Nf3", Some(Side::White), 5),
    );

    assert_eq!(found_a.len(), 1);
    assert_eq!(found_b.len(), 1);
    assert_eq!(indexes.games.len(), 1);
    assert_eq!(indexes.games.lookup(&GameId::new(SOURCE_GAME)).len(), 3);
    assert!(first.calls() + second.calls() >= 1);
}
