//! Index construction from the reference data dumps.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::error::{FinderError, Result};
use crate::opening::OpeningsIndex;
use crate::puzzles::PuzzlesIndex;

/// Opening catalog files, tab separated with an `eco name pgn` header.
pub const OPENING_FILES: [&str; 5] = ["a.tsv", "b.tsv", "c.tsv", "d.tsv", "e.tsv"];

/// Zstd-compressed puzzle dump inside the database directory.
pub const PUZZLES_DUMP_FILE: &str = "puzzles.csv.zst";

const OPENING_FIELDS: usize = 3;
const PUZZLE_FIELDS: usize = 10;

/// Build the openings index from the five catalog files in `dir`.
pub fn build_openings(dir: &Path) -> Result<OpeningsIndex> {
    let start = Instant::now();
    let mut index = OpeningsIndex::with_capacity(4096);

    for file in OPENING_FILES {
        let path = dir.join(file);
        let reader = File::open(&path).map_err(|e| {
            FinderError::Format(format!("failed to open {}: {e}", path.display()))
        })?;
        let count = read_openings(&mut index, reader, file)?;
        info!(file, count, "Read opening catalog");
    }

    info!(
        openings = index.len(),
        took_ms = start.elapsed().as_millis() as u64,
        "Built openings index"
    );
    Ok(index)
}

/// Insert every row of one tab-separated catalog. Returns the row count.
pub fn read_openings<R: Read>(index: &mut OpeningsIndex, reader: R, source: &str) -> Result<usize> {
    let mut rows = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut count = 0;
    for row in rows.records() {
        let row = row?;
        check_fields(&row, OPENING_FIELDS, source)?;
        index.insert(&row[1], &row[2])?;
        count += 1;
    }
    Ok(count)
}

/// Build the puzzles index from the compressed puzzle dump at `path`.
pub fn build_puzzles(path: &Path) -> Result<PuzzlesIndex> {
    let start = Instant::now();
    let file = File::open(path)
        .map_err(|e| FinderError::Format(format!("failed to open {}: {e}", path.display())))?;
    let decoder = zstd::Decoder::new(BufReader::new(file))?;

    let mut index = PuzzlesIndex::new();
    let source = path.display().to_string();
    let skipped = read_puzzles(&mut index, decoder, &source)?;

    info!(
        puzzles = index.len(),
        tags = index.tag_count(),
        skipped,
        took_ms = start.elapsed().as_millis() as u64,
        "Built puzzles index"
    );
    Ok(index)
}

/// Insert every tagged row of a puzzle CSV. Returns the number of rows
/// skipped for having no opening tags.
pub fn read_puzzles<R: Read>(index: &mut PuzzlesIndex, reader: R, source: &str) -> Result<usize> {
    let mut rows = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut skipped = 0;
    for row in rows.records() {
        let row = row?;
        check_fields(&row, PUZZLE_FIELDS, source)?;
        if row[9].trim().is_empty() {
            skipped += 1;
            continue;
        }
        index.insert(&row[0], &row[1], &row[8], &row[9])?;
    }
    Ok(skipped)
}

fn check_fields(row: &StringRecord, expected: usize, source: &str) -> Result<()> {
    if row.len() == expected {
        return Ok(());
    }
    let line = row.position().map(|p| p.line()).unwrap_or_default();
    Err(FinderError::Format(format!(
        "{source}:{line}: expected {expected} fields, got {}",
        row.len()
    )))
}
