#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chess_core::GameRecord;
use futures::StreamExt;
use puzzle_finder::{
    ExportError, GameExporter, GameId, GamesIndex, Indexes, OpeningsIndex, PuzzleRecord,
    PuzzlesIndex, SearchEngine, SearchOptions, Side,
};

pub const OPEN_GAME: &str = "King's Pawn: Open Game";
pub const OPEN_GAME_TAG: &str = "Kings_Pawn_Open_Game";

/// Black to move in the FEN, so white solves; full move 3.
pub const WHITE_SOLVES_FEN: &str = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 2 3";
/// White to move in the FEN, so black solves; full move 3.
pub const BLACK_SOLVES_FEN: &str = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";

pub fn game_url(id: &str) -> String {
    format!("https://lichess.org/{id}#5")
}

pub fn openings() -> OpeningsIndex {
    let mut index = OpeningsIndex::new();
    index.insert(OPEN_GAME, "1. e4 e5").unwrap();
    index
}

/// One puzzle tagged with the open game, solved by white at move 3.
pub fn single_puzzle(game_id: &str) -> PuzzlesIndex {
    let mut index = PuzzlesIndex::new();
    index
        .insert("00001", WHITE_SOLVES_FEN, &game_url(game_id), OPEN_GAME_TAG)
        .unwrap();
    index
}

/// `count` white-solved puzzles, each from its own game `g0000000`, `g0000001`, ...
pub fn many_puzzles(count: usize) -> PuzzlesIndex {
    let mut index = PuzzlesIndex::new();
    for i in 0..count {
        index
            .insert(&format!("p{i:04}"), WHITE_SOLVES_FEN, &game_url(&game_name(i)), OPEN_GAME_TAG)
            .unwrap();
    }
    index
}

pub fn game_name(i: usize) -> String {
    format!("g{i:07}")
}

pub fn games(entries: &[(&str, &str)]) -> GamesIndex {
    let index = GamesIndex::new();
    for (id, moves) in entries {
        index.insert(GameId::new(id), moves).unwrap();
    }
    index.mark_clean();
    index
}

pub fn options(workers: usize) -> SearchOptions {
    SearchOptions {
        workers,
        queue_capacity: 4,
        ..SearchOptions::default()
    }
}

pub fn engine(indexes: &Indexes, exporter: Arc<MockExporter>, options: SearchOptions) -> SearchEngine {
    SearchEngine::new(indexes, exporter, options)
}

pub async fn collect(engine: &SearchEngine, moves: &str, side: Option<Side>, max: u32) -> Vec<PuzzleRecord> {
    let game = chess_core::LiveGame::from_moves_text(moves).unwrap();
    engine.search_puzzles(&game, side, max).collect().await
}

/// In-memory stand-in for the remote game export.
#[derive(Default)]
pub struct MockExporter {
    games: HashMap<GameId, String>,
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
    requested: AtomicUsize,
}

impl MockExporter {
    pub fn with_games(entries: &[(&str, &str)]) -> Self {
        Self {
            games: entries
                .iter()
                .map(|(id, moves)| (GameId::new(id), moves.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameExporter for MockExporter {
    async fn export_games(&self, ids: &[GameId]) -> Result<Vec<(GameId, GameRecord)>, ExportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.fetch_add(ids.len(), Ordering::SeqCst);
        assert!(ids.len() <= puzzle_finder::MAX_EXPORT_GAMES);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ExportError::Status(500));
        }

        Ok(ids
            .iter()
            .filter_map(|id| {
                let moves = self.games.get(id)?;
                Some((*id, GameRecord::parse(moves).unwrap()))
            })
            .collect())
    }
}
