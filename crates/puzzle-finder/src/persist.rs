//! Compressed binary persistence for the indexes.
//!
//! Every index is written as bincode inside a zstd frame and read back in
//! full at start-up.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FinderError, Result};

const ZSTD_LEVEL: i32 = 3;

/// Serialize and compress `value` into a byte buffer.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_to(value, &mut out).map_err(FinderError::Format)?;
    Ok(out)
}

/// Decompress and deserialize a buffer produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    read_from(bytes).map_err(FinderError::Format)
}

/// Load an index file written by [`save_index`].
pub fn load_index<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| FinderError::IndexLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    read_from(BufReader::new(file)).map_err(|reason| FinderError::IndexLoad {
        path: path.to_path_buf(),
        reason,
    })
}

/// Write an index file, replacing any previous one.
pub fn save_index<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let save_err = |reason: String| FinderError::IndexSave {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
    }

    let file = File::create(path).map_err(|e| save_err(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    write_to(value, &mut writer).map_err(save_err)?;
    writer.flush().map_err(|e| save_err(e.to_string()))
}

fn write_to<T: Serialize, W: Write>(value: &T, writer: W) -> std::result::Result<(), String> {
    let mut encoder = zstd::Encoder::new(writer, ZSTD_LEVEL).map_err(|e| e.to_string())?;
    bincode::serialize_into(&mut encoder, value).map_err(|e| e.to_string())?;
    encoder.finish().map_err(|e| e.to_string())?;
    Ok(())
}

fn read_from<T: DeserializeOwned, R: Read>(reader: R) -> std::result::Result<T, String> {
    let decoder = zstd::Decoder::new(reader).map_err(|e| e.to_string())?;
    bincode::deserialize_from(decoder).map_err(|e| e.to_string())
}
