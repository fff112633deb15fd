//! Chunk normalizer
//!
//! Repairs one raw chunk into a JSON array and parses it. Objects emitted
//! back to back (`}{`) get a separator, a single trailing comma is dropped,
//! and the whole thing is wrapped in `[...]`.

use super::StreamEvent;
use thiserror::Error;

/// A chunk that could not be parsed even after repair
#[derive(Debug, Error)]
#[error("Malformed stream chunk ({len} bytes): {source}")]
pub struct ChunkError {
    pub len: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Parse one raw chunk into stream events.
///
/// Empty and whitespace-only chunks yield no events.
pub fn normalize_chunk(raw: &str) -> Result<Vec<StreamEvent>, ChunkError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let joined = trimmed.replace("}{", "},{");
    let body = joined.strip_suffix(',').unwrap_or(&joined);

    serde_json::from_str(&format!("[{body}]")).map_err(|source| ChunkError {
        len: raw.len(),
        source,
    })
}

/// Parse a chunk, logging and discarding it on failure.
///
/// The stream is never retried or partially recovered; the caller simply
/// waits for the next chunk.
pub fn decode_chunk(raw: &str) -> Vec<StreamEvent> {
    match normalize_chunk(raw) {
        Ok(events) => {
            tracing::debug!(bytes = raw.len(), events = events.len(), "Decoded stream chunk");
            events
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed stream chunk");
            Vec::new()
        }
    }
}
