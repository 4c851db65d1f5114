//! Core data models used throughout PDF Scholar.
//!
//! These types represent the pages, chunks, and document handles that
//! flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// One page of extracted text. Immutable once created.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Page {
    /// Raw text content. May be empty for image-only pages.
    pub text: String,
    /// 1-based page number.
    pub page_index: usize,
    /// Total pages in the document at extraction time.
    pub total_pages: usize,
}

/// A bounded sub-span of one page's text, the unit of embedding and
/// retrieval. Chunks are created during index construction and never
/// mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    /// Contiguous position within the document, starting at 0.
    pub chunk_index: i64,
    pub text: String,
    /// Display name of the source document.
    pub source: String,
    /// 1-based page the chunk was derived from.
    pub page: usize,
    /// SHA-256 of the chunk text, for staleness detection.
    pub hash: String,
}

/// Returned from ingestion; identifies a cataloged document.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct DocumentHandle {
    /// Generated UUID. The authoritative key; the display name is
    /// metadata only.
    pub id: String,
    pub name: String,
    pub page_count: usize,
    pub chunk_count: usize,
}
