//! GLB (binary glTF) container encoding.
//!
//! Layout:
//! - 12-byte header (magic, version 2, total length)
//! - JSON chunk, padded to 4 bytes with spaces
//! - optional BIN chunk, padded to 4 bytes with zeros

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

pub const GLB_MAGIC: u32 = 0x46546C67; // "glTF"
pub const GLB_VERSION: u32 = 2;
const GLB_HEADER_SIZE: usize = 12;
const CHUNK_HEADER_SIZE: usize = 8;
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F534A;
pub const CHUNK_TYPE_BIN: u32 = 0x004E4942;

fn padding(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// Encode a glTF JSON document and its binary buffer as GLB bytes.
///
/// The BIN chunk is omitted when `bin_data` is empty.
pub fn encode_glb(json_str: &str, bin_data: &[u8]) -> Vec<u8> {
    let json_bytes = json_str.as_bytes();
    let json_len = json_bytes.len() + padding(json_bytes.len());
    let bin_len = bin_data.len() + padding(bin_data.len());

    let mut total = GLB_HEADER_SIZE + CHUNK_HEADER_SIZE + json_len;
    if !bin_data.is_empty() {
        total += CHUNK_HEADER_SIZE + bin_len;
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_len as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
    out.extend_from_slice(json_bytes);
    out.resize(out.len() + padding(json_bytes.len()), b' ');

    if !bin_data.is_empty() {
        out.extend_from_slice(&(bin_len as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
        out.extend_from_slice(bin_data);
        out.resize(out.len() + padding(bin_data.len()), 0);
    }

    out
}

/// Write a GLB file, creating or truncating `path`.
pub fn write_glb(json_str: &str, bin_data: &[u8], path: &Path) -> Result<()> {
    let bytes = encode_glb(json_str, bin_data);
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create GLB: {}", path.display()))?;
    file.write_all(&bytes)
        .with_context(|| format!("Failed to write GLB: {}", path.display()))?;
    Ok(())
}
