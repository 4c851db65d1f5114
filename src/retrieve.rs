//! Query-time retrieval.
//!
//! Thin composition over the embedding provider and [`VectorIndex`]:
//! embed the query text, then search. Retrieval breadth is a tuning
//! knob per task (answers need few focused chunks, notes need broad
//! coverage), so `k` always comes from the caller, never a constant
//! here.
//!
//! Summary and notes modes do not have a user question to retrieve
//! against. Two probe policies:
//! - `literal` — retrieve against the literal task token. Retrieval
//!   quality then depends on whatever chunks happen to resemble the
//!   word "summarize"; kept as the compatible default.
//! - `leading` — take the first `k` chunks in document order, skipping
//!   similarity entirely. A retrieval-agnostic policy for
//!   whole-document synthesis.

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{SearchMode, VectorIndex};
use crate::models::Chunk;

/// Retrieval probe used when a flow has no user query.
pub const SUMMARY_PROBE: &str = "summarize";
pub const NOTES_PROBE: &str = "generate notes";

/// Context-selection policy for summary/notes flows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Probe {
    /// Similarity-retrieve against the literal task token.
    Literal,
    /// First `k` chunks in document order.
    Leading,
}

impl Probe {
    /// Parse the `[retrieval] probe` config value (validated upstream).
    pub fn from_config(value: &str) -> Probe {
        match value {
            "leading" => Probe::Leading,
            _ => Probe::Literal,
        }
    }
}

/// Embed `query_text` and return up to `k` ranked chunks from `index`.
pub async fn retrieve(
    index: &VectorIndex,
    provider: &dyn EmbeddingProvider,
    query_text: &str,
    k: usize,
    mode: SearchMode,
) -> Result<Vec<(Chunk, f32)>> {
    let query_vec = provider.embed_query(query_text).await?;
    Ok(index.search(&query_vec, k, mode))
}

/// The first `k` chunks in document order, scored 1.0.
///
/// Used by the `leading` probe; no embedding call is made.
pub fn leading_chunks(index: &VectorIndex, k: usize) -> Vec<(Chunk, f32)> {
    index
        .chunks()
        .iter()
        .take(k)
        .map(|c| (c.clone(), 1.0))
        .collect()
}
