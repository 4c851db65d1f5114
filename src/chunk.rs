//! Overlapping text chunker with natural-boundary splitting.
//!
//! Splits page text into [`Chunk`]s of at most `chunk_size` characters,
//! where consecutive chunks from the same page share `chunk_overlap`
//! trailing/leading characters so local context survives a boundary.
//! Split points prefer natural boundaries, tried in order: paragraph
//! breaks (`\n\n`), line breaks (`\n`), sentence breaks (`. `), then
//! single spaces, falling back to a hard character cut.
//!
//! Chunks are exact sub-spans of the page text: concatenating a page's
//! chunks with each chunk's leading overlap removed reproduces the page
//! text byte for byte. Chunking is per page, so every chunk is
//! attributed to exactly the page it came from.
//!
//! Each chunk receives a v4 UUID plus a SHA-256 hash of its text for
//! staleness detection.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Chunk, Page};

/// Split boundaries, in priority order.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split a document's pages into chunks with contiguous indices
/// starting at 0. Whitespace-only pages produce no chunks.
///
/// Sizes are measured in characters, not bytes. Fails fast with
/// [`Error::Config`] when `chunk_overlap >= chunk_size`, producing zero
/// chunks rather than looping.
pub fn split_pages(
    document_id: &str,
    source: &str,
    pages: &[Page],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(Error::Config("chunk_size must be > 0".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(Error::Config(format!(
            "chunk_overlap ({}) must be < chunk_size ({})",
            chunk_overlap, chunk_size
        )));
    }

    let mut chunks = Vec::new();
    let mut chunk_index: i64 = 0;

    for page in pages {
        if page.text.trim().is_empty() {
            continue;
        }
        for (span_start, span_end) in split_spans(&page.text, chunk_size, chunk_overlap) {
            let text = &page.text[span_start..span_end];
            chunks.push(make_chunk(
                document_id,
                source,
                page.page_index,
                chunk_index,
                text,
            ));
            chunk_index += 1;
        }
    }

    Ok(chunks)
}

/// Compute chunk spans as byte ranges over `text`.
///
/// Spans are exact: span N+1 begins `chunk_overlap` characters before
/// span N ends, so the overlap region is shared verbatim. Progress is
/// guaranteed because every cut lands strictly beyond
/// `start + chunk_overlap`.
fn split_spans(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, usize)> {
    // Byte offset of every char boundary, plus the end of the text.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let n = boundaries.len() - 1;

    if n == 0 {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + chunk_size).min(n);
        if end == n {
            spans.push((boundaries[start], boundaries[n]));
            break;
        }

        let cut = find_cut(text, &boundaries, start, end, chunk_overlap);
        spans.push((boundaries[start], boundaries[cut]));
        start = cut - chunk_overlap;
    }

    spans
}

/// Pick the cut position (in chars) for a chunk starting at `start`
/// whose window extends to `end`. Tries each separator in priority
/// order, taking its last occurrence inside the window; a cut is only
/// valid past `start + overlap` so the next chunk makes progress. Falls
/// back to a hard cut at `end`.
fn find_cut(text: &str, boundaries: &[usize], start: usize, end: usize, overlap: usize) -> usize {
    let window = &text[boundaries[start]..boundaries[end]];

    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            let cut_byte = boundaries[start] + pos + sep.len();
            // Separators are ASCII, so the cut is always a char boundary.
            if let Ok(cut) = boundaries.binary_search(&cut_byte) {
                if cut > start + overlap {
                    return cut;
                }
            }
        }
    }

    end
}

fn make_chunk(
    document_id: &str,
    source: &str,
    page: usize,
    chunk_index: i64,
    text: &str,
) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index,
        text: text.to_string(),
        source: source.to_string(),
        page,
        hash,
    }
}
