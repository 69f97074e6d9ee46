//! Reassembly of synthesized chunks into one playable payload
//!
//! The synthesis backend returns MP3 frame streams, which tolerate raw
//! concatenation, so chunks are joined byte-for-byte with no added framing,
//! silence or headers.

use super::synthesizer::SynthesizedChunk;
use crate::{Error, Result};

/// Concatenate chunk payloads in ascending index order.
///
/// Completion order does not matter; chunks are sorted first.
///
/// # Errors
///
/// Returns [`Error::ReassemblyPrecondition`] when `chunks` is empty. Callers
/// are expected to check for a total synthesis failure before reassembling.
pub fn reassemble(mut chunks: Vec<SynthesizedChunk>) -> Result<Vec<u8>> {
    if chunks.is_empty() {
        return Err(Error::ReassemblyPrecondition);
    }

    chunks.sort_by_key(|c| c.index);

    let total = chunks.iter().map(|c| c.audio.len()).sum();
    let mut combined = Vec::with_capacity(total);
    for chunk in &chunks {
        combined.extend_from_slice(&chunk.audio);
    }

    tracing::debug!(
        chunks = chunks.len(),
        bytes = combined.len(),
        "reassembled audio"
    );

    Ok(combined)
}
