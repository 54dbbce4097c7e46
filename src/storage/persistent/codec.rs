//! On-disk format of one document file.
//!
//! ```text
//! [magic "PKMN"][version: u8][payload length: u32 LE][payload: JSON][crc32: u32 LE]
//! ```
//!
//! The checksum covers every byte before it, header included. A file is
//! always read whole, so a frame is decoded from a slice and any length other
//! than the one the header announces counts as damage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const MAGIC: [u8; 4] = *b"PKMN";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + 4;
const TRAILER_LEN: usize = 4;

/// Budget documents are small; anything bigger is damage, not data.
const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Envelope written around every stored value.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Key the document was written under; checked on read.
    pub key: String,
    /// Wall-clock time of the write.
    pub written_at: DateTime<Utc>,
    /// The document itself.
    pub value: Value,
}

/// Why a document file could not be framed or unframed.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("not a pocketmoney document (magic bytes {0:?})")]
    BadMagic([u8; 4]),

    #[error(
        "unsupported document format version {0} (expected {expected})",
        expected = FORMAT_VERSION
    )]
    UnsupportedVersion(u8),

    #[error("file is {actual} bytes but its frame needs {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("payload of {0} bytes exceeds the {limit} byte limit", limit = MAX_PAYLOAD)]
    TooLarge(usize),

    #[error("checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    Checksum { stored: u32, computed: u32 },

    #[error("payload is not a stored document: {0}")]
    Payload(#[from] serde_json::Error),
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Frames `doc` as the complete contents of a document file.
pub fn encode(doc: &StoredDocument) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(doc)?;
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::TooLarge(payload.len()));
    }
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge(payload.len()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

/// Verifies and unframes the complete contents of a document file.
pub fn decode(bytes: &[u8]) -> Result<StoredDocument, FrameError> {
    let minimum = HEADER_LEN + TRAILER_LEN;
    if bytes.len() < minimum {
        return Err(FrameError::LengthMismatch {
            expected: minimum,
            actual: bytes.len(),
        });
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(FrameError::BadMagic([bytes[0], bytes[1], bytes[2], bytes[3]]));
    }
    let version = bytes[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(FrameError::UnsupportedVersion(version));
    }

    let len = read_u32(bytes, MAGIC.len() + 1) as usize;
    if len > MAX_PAYLOAD {
        return Err(FrameError::TooLarge(len));
    }
    let body_end = HEADER_LEN + len;
    if bytes.len() != body_end + TRAILER_LEN {
        return Err(FrameError::LengthMismatch {
            expected: body_end + TRAILER_LEN,
            actual: bytes.len(),
        });
    }

    let stored = read_u32(bytes, body_end);
    let computed = crc32fast::hash(&bytes[..body_end]);
    if stored != computed {
        return Err(FrameError::Checksum { stored, computed });
    }
    Ok(serde_json::from_slice(&bytes[HEADER_LEN..body_end])?)
}
