//! PDF text extraction.
//!
//! Wraps `pdf-extract` so the rest of the pipeline only sees ordered
//! [`Page`] records with 1-based page numbers. Extraction failures are
//! [`Error::Ingest`] and abort only the offending document; a batch
//! ingest continues with its remaining files.

use crate::error::{Error, Result};
use crate::models::Page;

/// Extract per-page text from PDF bytes.
///
/// Returns one [`Page`] per physical page, in order. Pages with no
/// extractable text (e.g. scanned images) come back with empty text —
/// the chunker skips them later, so an all-image document yields an
/// empty index rather than an error here.
pub fn extract_pages(name: &str, bytes: &[u8]) -> Result<Vec<Page>> {
    let texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::Ingest(format!("could not read {}: {}", name, e)))?;

    let total_pages = texts.len();
    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page {
            text,
            page_index: i + 1,
            total_pages,
        })
        .collect())
}
