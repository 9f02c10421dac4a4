pub mod chunk;
pub mod segment;

pub use chunk::{pack_chunks, Chunk};
pub use segment::{split_by_length, split_sections};

use crate::error::{DeltascapeError, Result};

/// Cut a raw diff into chunks no longer than `max_chunk_len` characters
///
/// Sections are length-bounded before packing, so every chunk fits the
/// budget. A chunk that does not fit means the segmenter or packer is broken
/// and is reported as a `SegmentationInvariant` error.
pub fn plan_chunks(diff: &str, max_chunk_len: usize, separator: &str) -> Result<Vec<Chunk>> {
    let fragments = split_sections(diff).flat_map(|section| split_by_length(section, max_chunk_len));
    let chunks = pack_chunks(fragments, max_chunk_len, separator);

    if let Some((index, chunk)) = chunks
        .iter()
        .enumerate()
        .find(|(_, chunk)| chunk.len() > max_chunk_len)
    {
        return Err(DeltascapeError::SegmentationInvariant(format!(
            "chunk {} is {} chars ({} fragments), budget is {}",
            index,
            chunk.len(),
            chunk.fragment_count(),
            max_chunk_len
        )));
    }

    Ok(chunks)
}
