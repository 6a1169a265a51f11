//! Opening-puzzle search.
//!
//! A query resolves the game's opening, walks that opening's puzzle bucket and
//! fans the candidates out to a pool of verification workers. Candidates whose
//! source game is not indexed yet are collected into export batches; exported
//! games are inserted into the games index and their candidates queued for
//! verification before the bucket walk continues. Confirmed puzzles are
//! streamed to the caller as they are found.

use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use chess_core::{BoardPosition, GameRecord, LiveGame, Move};
use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clients::{GameExporter, MAX_EXPORT_GAMES};
use crate::config::FinderConfig;
use crate::error::{ExportError, FinderError};
use crate::games::{GameId, GamesIndex};
use crate::indexes::Indexes;
use crate::opening::{OpeningMatch, OpeningsIndex};
use crate::puzzles::{PuzzleRecord, PuzzlesIndex, Side};

/// How a candidate's source game is checked against the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verification {
    /// The moves played after the opening appear as a contiguous run.
    #[default]
    Moves,
    /// The query's final piece placement is reached somewhere in the game.
    Position,
}

impl FromStr for Verification {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "moves" => Ok(Verification::Moves),
            "position" => Ok(Verification::Position),
            other => Err(FinderError::Format(format!("unknown verification mode: {other:?}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub workers: usize,
    /// Unknown-game candidates collected before an export is issued.
    pub batch_size: usize,
    /// Capacity of both the job queue and the result queue.
    pub queue_capacity: usize,
    pub verification: Verification,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            batch_size: MAX_EXPORT_GAMES,
            queue_capacity: 64,
            verification: Verification::Moves,
        }
    }
}

impl From<&FinderConfig> for SearchOptions {
    fn from(config: &FinderConfig) -> Self {
        Self {
            workers: config.workers,
            batch_size: config.export_batch,
            verification: config.verification,
            ..Self::default()
        }
    }
}

/// Counters reported when a query completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Bucket entries that passed the side and move filters.
    pub candidates: usize,
    /// Candidates checked by a worker.
    pub verified: usize,
    /// Candidates confirmed and delivered.
    pub found: usize,
    /// Games received from the exporter.
    pub exported: usize,
    /// Candidates given up on (failed export or game still unknown).
    pub dropped: usize,
    pub cancelled: bool,
}

/// What a candidate's game record must contain.
#[derive(Debug, Clone)]
enum Target {
    Moves(Vec<Move>),
    Position(BoardPosition),
}

impl Target {
    fn new(verification: Verification, game: &LiveGame, opening: &OpeningMatch) -> Self {
        match verification {
            Verification::Moves => Target::Moves(opening.leftover.clone()),
            Verification::Position => Target::Position(game.board_position()),
        }
    }

    fn matches(&self, record: &GameRecord) -> bool {
        match self {
            Target::Moves(moves) => record.contains_moves(moves),
            Target::Position(position) => record.contains_position(position),
        }
    }
}

struct Job {
    puzzle: PuzzleRecord,
    record: GameRecord,
}

/// Puzzle search over a set of loaded indexes.
///
/// Must be used from within a Tokio runtime.
#[derive(Clone)]
pub struct SearchEngine {
    openings: Arc<OpeningsIndex>,
    games: Arc<GamesIndex>,
    puzzles: Arc<PuzzlesIndex>,
    exporter: Arc<dyn GameExporter>,
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(indexes: &Indexes, exporter: Arc<dyn GameExporter>, options: SearchOptions) -> Self {
        Self {
            openings: Arc::clone(&indexes.openings),
            games: Arc::clone(&indexes.games),
            puzzles: Arc::clone(&indexes.puzzles),
            exporter,
            options,
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Deepest catalogued opening of `game` and the moves played after it.
    pub fn resolve_opening(&self, game: &LiveGame) -> OpeningMatch {
        self.openings.resolve(game)
    }

    /// Stream puzzles that continue `game`. `side` of `None` accepts both
    /// solving sides; `max_moves` counts full moves after the opening.
    pub fn search_puzzles(&self, game: &LiveGame, side: Option<Side>, max_moves: u32) -> PuzzleStream {
        self.search_puzzles_with_cancel(game, side, max_moves, CancellationToken::new())
    }

    /// Like [`search_puzzles`](Self::search_puzzles), stopping early once
    /// `cancel` fires. Dropping the returned stream stops the search without
    /// cancelling `cancel` itself.
    pub fn search_puzzles_with_cancel(
        &self,
        game: &LiveGame,
        side: Option<Side>,
        max_moves: u32,
        cancel: CancellationToken,
    ) -> PuzzleStream {
        let cancel = cancel.child_token();
        let opening = self.resolve_opening(game);
        if !opening.is_found() {
            info!(plies = game.ply_count(), "No opening found for game");
            return PuzzleStream::empty(cancel);
        }

        let tag = opening.name.tag();
        let ceiling = max_moves.saturating_add((opening.ply / 2) as u32);
        info!(
            opening = %opening.name,
            tag = %tag,
            leftover = opening.leftover.len(),
            ceiling,
            "Resolved opening"
        );

        let target = Target::new(self.options.verification, game, &opening);
        let (out_tx, out_rx) = mpsc::channel(self.options.queue_capacity.max(1));

        let query = Query {
            engine: self.clone(),
            tag,
            side,
            ceiling,
            target: Arc::new(target),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(query.run(out_tx));

        PuzzleStream {
            rx: out_rx,
            cancel,
            handle: Some(handle),
        }
    }
}

/// Confirmed puzzles of one query, in discovery order.
///
/// Ends when the bucket is exhausted or the search is cancelled. Dropping the
/// stream cancels the search.
pub struct PuzzleStream {
    rx: mpsc::Receiver<PuzzleRecord>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<SearchStats>>,
}

impl PuzzleStream {
    fn empty(cancel: CancellationToken) -> Self {
        let (_, rx) = mpsc::channel(1);
        Self {
            rx,
            cancel,
            handle: None,
        }
    }

    /// Stop the search; already confirmed puzzles may still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop receiving, wait for the search task and report its counters.
    pub async fn finish(mut self) -> SearchStats {
        self.rx.close();
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!("Search task failed: {e}");
                SearchStats::default()
            }),
            None => SearchStats::default(),
        }
    }
}

impl Stream for PuzzleStream {
    type Item = PuzzleRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for PuzzleStream {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}

struct Query {
    engine: SearchEngine,
    tag: String,
    side: Option<Side>,
    ceiling: u32,
    target: Arc<Target>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct WorkerCounters {
    verified: AtomicUsize,
    found: AtomicUsize,
}

impl Query {
    async fn run(self, out: mpsc::Sender<PuzzleRecord>) -> SearchStats {
        let start = Instant::now();
        let options = &self.engine.options;
        let (job_tx, job_rx) = async_channel::bounded::<Job>(options.queue_capacity.max(1));
        let counters = Arc::new(WorkerCounters::default());

        let mut workers = Vec::with_capacity(options.workers.max(1));
        for worker_id in 0..options.workers.max(1) {
            workers.push(tokio::spawn(verify_worker(
                worker_id,
                job_rx.clone(),
                out.clone(),
                Arc::clone(&self.target),
                Arc::clone(&counters),
                self.cancel.clone(),
            )));
        }
        drop(job_rx);
        drop(out);

        let mut stats = SearchStats::default();
        self.produce(&job_tx, &mut stats).await;
        drop(job_tx);

        for worker in workers {
            if let Err(e) = worker.await {
                warn!("Verification worker failed: {e}");
            }
        }

        stats.verified = counters.verified.load(Ordering::Relaxed);
        stats.found = counters.found.load(Ordering::Relaxed);
        stats.cancelled = self.cancel.is_cancelled();

        info!(
            tag = %self.tag,
            candidates = stats.candidates,
            verified = stats.verified,
            found = stats.found,
            exported = stats.exported,
            dropped = stats.dropped,
            cancelled = stats.cancelled,
            took_ms = start.elapsed().as_millis() as u64,
            "Puzzle search finished"
        );
        stats
    }

    /// Walk the bucket, queueing known games and exporting unknown ones.
    async fn produce(&self, jobs: &async_channel::Sender<Job>, stats: &mut SearchStats) {
        let engine = &self.engine;
        let batch_size = engine.options.batch_size.clamp(1, MAX_EXPORT_GAMES);
        let mut pending: Vec<PuzzleRecord> = Vec::with_capacity(batch_size);

        for puzzle in engine.puzzles.search(&self.tag, self.side, self.ceiling) {
            if self.cancel.is_cancelled() {
                return;
            }
            stats.candidates += 1;

            if puzzle.game_id.is_zero() {
                stats.dropped += 1;
                continue;
            }

            let record = engine.games.lookup(&puzzle.game_id);
            if record.is_empty() {
                pending.push(*puzzle);
                if pending.len() >= batch_size && !self.export_batch(&mut pending, jobs, stats).await {
                    return;
                }
            } else if !self.queue(jobs, *puzzle, record).await {
                return;
            }
        }

        if !pending.is_empty() {
            self.export_batch(&mut pending, jobs, stats).await;
        }
    }

    /// Export the games behind `pending`, insert them and queue the batch.
    /// Returns false once the query should stop.
    async fn export_batch(
        &self,
        pending: &mut Vec<PuzzleRecord>,
        jobs: &async_channel::Sender<Job>,
        stats: &mut SearchStats,
    ) -> bool {
        let batch = std::mem::take(pending);
        let mut ids: Vec<GameId> = batch.iter().map(|puzzle| puzzle.game_id).collect();
        ids.sort_unstable();
        ids.dedup();

        if self.cancel.is_cancelled() {
            return false;
        }

        debug!(games = ids.len(), candidates = batch.len(), "Exporting games");
        let exported = tokio::select! {
            _ = self.cancel.cancelled() => Err(ExportError::Cancelled),
            result = self.engine.exporter.export_games(&ids) => result,
        };

        match exported {
            Ok(games) => {
                stats.exported += games.len();
                for (id, record) in games {
                    self.engine.games.insert_record(id, record);
                }
            }
            Err(ExportError::Cancelled) => return false,
            Err(e) => {
                warn!(games = ids.len(), "Game export failed, dropping batch: {e}");
                stats.dropped += batch.len();
                return true;
            }
        }

        for puzzle in batch {
            let record = self.engine.games.lookup(&puzzle.game_id);
            if record.is_empty() {
                stats.dropped += 1;
                continue;
            }
            if !self.queue(jobs, puzzle, record).await {
                return false;
            }
        }

        true
    }

    async fn queue(&self, jobs: &async_channel::Sender<Job>, puzzle: PuzzleRecord, record: GameRecord) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = jobs.send(Job { puzzle, record }) => sent.is_ok(),
        }
    }
}

async fn verify_worker(
    worker_id: usize,
    jobs: async_channel::Receiver<Job>,
    out: mpsc::Sender<PuzzleRecord>,
    target: Arc<Target>,
    counters: Arc<WorkerCounters>,
    cancel: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Ok(job) => job,
                Err(_) => break,
            },
        };

        counters.verified.fetch_add(1, Ordering::Relaxed);
        if !target.matches(&job.record) {
            continue;
        }

        let delivered = tokio::select! {
            _ = cancel.cancelled() => false,
            sent = out.send(job.puzzle) => sent.is_ok(),
        };
        if !delivered {
            // receiver gone; stop the whole query
            cancel.cancel();
            break;
        }
        counters.found.fetch_add(1, Ordering::Relaxed);
    }

    debug!(worker_id, "Verification worker stopped");
}
