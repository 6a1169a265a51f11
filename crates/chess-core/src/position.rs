//! Piece-placement positions and their content fingerprints.
//!
//! Only the placement field of a FEN takes part in the fingerprint. Castling
//! rights, the en passant square and the clocks are ignored, so positions
//! reached by different move orders hash equally.

use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Position};

/// Size of a position fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 16;

/// 16-byte content hash of a piece placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; FINGERPRINT_LEN]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Piece placement of a board, e.g. `rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR`.
///
/// The default value carries no board data and encodes to an empty payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardPosition {
    placement: String,
}

impl BoardPosition {
    pub fn from_chess(pos: &Chess) -> Self {
        Self {
            placement: pos.board().to_string(),
        }
    }

    /// Build from a FEN or a bare placement field. Only the first field is kept.
    pub fn from_fen(fen: &str) -> Self {
        Self {
            placement: fen.split_whitespace().next().unwrap_or_default().to_string(),
        }
    }

    pub fn placement(&self) -> &str {
        &self.placement
    }

    pub fn is_empty(&self) -> bool {
        self.placement.is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint_placement(&self.placement)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.placement.as_bytes().to_vec()
    }

    /// Inverse of [`BoardPosition::to_bytes`]. An empty payload is the zero position.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            placement: String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl fmt::Display for BoardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.placement)
    }
}

/// Fingerprint of a live position.
pub fn fingerprint(pos: &Chess) -> Fingerprint {
    fingerprint_placement(&pos.board().to_string())
}

fn fingerprint_placement(placement: &str) -> Fingerprint {
    let mut out = [0u8; FINGERPRINT_LEN];
    let mut hasher = blake3::Hasher::new();
    hasher.update(placement.as_bytes());
    hasher.finalize_xof().fill(&mut out);
    Fingerprint(out)
}
