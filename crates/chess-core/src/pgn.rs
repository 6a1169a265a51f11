//! PGN parsing utilities: a lightweight regex-based parser.

use std::sync::LazyLock;

use regex::Regex;

const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("header regex"));
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("comment regex"));
static VARIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("variation regex"));
static MOVE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.+").expect("move number regex"));

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Split PGN movetext into SAN tokens (after removing headers, comments, variations).
///
/// Move numbers (also glued forms like `1.e4` and `1...e5`), results, NAGs and
/// annotation glyphs are skipped. Every other token is returned as is, so
/// malformed text surfaces when the token is played.
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = HEADER_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");
    let no_variations = VARIATION_RE.replace_all(&no_comments, "");

    no_variations
        .split_whitespace()
        .filter_map(|token| {
            let token = MOVE_NUMBER_RE.find(token).map_or(token, |m| &token[m.end()..]);
            if token.is_empty() || RESULTS.contains(&token) || token.starts_with('$') {
                return None;
            }
            let token = token.trim_end_matches(['!', '?']);
            if token.is_empty() {
                return None;
            }
            Some(token.to_string())
        })
        .collect()
}

/// Extract a string value from a PGN header (e.g. GameId, Site).
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// True unless the PGN declares a custom start position.
pub fn has_standard_start(pgn: &str) -> bool {
    if extract_header(pgn, "SetUp").as_deref() != Some("1") {
        return true;
    }
    match extract_header(pgn, "FEN") {
        Some(fen) => fen == STANDARD_START_FEN,
        None => true,
    }
}

/// Split a multi-game PGN export into individual games.
/// Games are separated by two blank lines.
pub fn split_games(body: &str) -> Vec<&str> {
    body.split("\n\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect()
}
