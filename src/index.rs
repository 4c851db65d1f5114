//! Per-document vector index with persistence.
//!
//! A [`VectorIndex`] holds every chunk and embedding vector for one
//! document and answers nearest-neighbor queries by exact brute-force
//! cosine similarity — collection sizes here are personal (hundreds to
//! low thousands of chunks), so an approximate structure would buy
//! nothing.
//!
//! Two retrieval modes:
//! - **Similarity** — top-k by descending cosine similarity.
//! - **MMR** (maximal marginal relevance) — from a similarity-ranked
//!   candidate pool, iteratively select the chunk maximizing
//!   `λ·relevance − (1−λ)·max_similarity(chunk, selected)`. Trades
//!   relevance against redundancy; a single document's top-k similarity
//!   hits are often near-duplicate passages, which wastes prompt budget.
//!
//! Indexes persist as one self-describing JSON file per document under
//! a filesystem-safe key ([`sanitize_key`]), vectors stored base64
//! encoded in the little-endian f32 blob format. Loading an index back
//! yields search behavior identical to the saved one.
//!
//! `search` takes `&self` and never mutates: concurrent searches
//! against one index handle are safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{Error, Result};
use crate::models::Chunk;

/// On-disk format version; bumped on incompatible layout changes.
const FORMAT_VERSION: u32 = 1;

/// Minimum MMR candidate pool size.
const MIN_MMR_POOL: usize = 20;

/// Retrieval mode for [`VectorIndex::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchMode {
    /// Top-k by descending cosine similarity.
    Similarity,
    /// Maximal marginal relevance with trade-off `lambda` in `[0, 1]`.
    Mmr { lambda: f32 },
}

/// In-memory nearest-neighbor structure over one document's chunks.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    document_id: String,
    document_name: String,
    model: String,
    dims: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

/// Serialized index layout: format header plus one record per chunk.
#[derive(Serialize, Deserialize)]
struct IndexFile {
    format_version: u32,
    document_id: String,
    document_name: String,
    model: String,
    dims: usize,
    created_at: DateTime<Utc>,
    chunks: Vec<StoredChunk>,
}

#[derive(Serialize, Deserialize)]
struct StoredChunk {
    #[serde(flatten)]
    chunk: Chunk,
    /// Base64 of little-endian f32 bytes.
    vector: String,
}

impl VectorIndex {
    /// Construct a searchable index from parallel chunk and vector
    /// slices. Every chunk must have exactly one vector of the stated
    /// dimensionality.
    pub fn build(
        document_id: &str,
        document_name: &str,
        model: &str,
        dims: usize,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::Ingest(format!(
                "index build mismatch: {} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        for v in &vectors {
            if v.len() != dims {
                return Err(Error::Ingest(format!(
                    "index build mismatch: {}-dim vector, expected {}",
                    v.len(),
                    dims
                )));
            }
        }

        Ok(Self {
            document_id: document_id.to_string(),
            document_name: document_name.to_string(),
            model: model.to_string(),
            dims,
            chunks,
            vectors,
        })
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    /// Embedding model the index was built with. Queries must be
    /// embedded with the same model to be comparable.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks in document order. Used by the `leading` probe and for
    /// previews.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Return up to `k` distinct chunks ranked for the query vector.
    ///
    /// `k` larger than the index size caps silently. Scores are cosine
    /// relevance to the query in both modes; MMR changes which chunks
    /// are picked, not how relevance is reported.
    pub fn search(&self, query_vec: &[f32], k: usize, mode: SearchMode) -> Vec<(Chunk, f32)> {
        if k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let ranked = self.ranked_by_similarity(query_vec);

        let picked: Vec<(usize, f32)> = match mode {
            SearchMode::Similarity => ranked.into_iter().take(k).collect(),
            SearchMode::Mmr { lambda } => self.mmr_select(&ranked, k, lambda),
        };

        picked
            .into_iter()
            .map(|(i, score)| (self.chunks[i].clone(), score))
            .collect()
    }

    /// All chunk positions ordered by descending similarity, ties
    /// broken by document order for determinism.
    fn ranked_by_similarity(&self, query_vec: &[f32]) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query_vec, v)))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked
    }

    /// Greedy MMR selection over the top of the similarity ranking.
    ///
    /// The candidate pool is `max(4k, 20)` chunks; each round picks the
    /// candidate maximizing `λ·relevance − (1−λ)·redundancy`, where
    /// redundancy is the highest similarity to any already-selected
    /// chunk. The first pick is always the most relevant chunk.
    fn mmr_select(&self, ranked: &[(usize, f32)], k: usize, lambda: f32) -> Vec<(usize, f32)> {
        let pool_size = (k * 4).max(MIN_MMR_POOL).min(ranked.len());
        let mut remaining: Vec<(usize, f32)> = ranked[..pool_size].to_vec();
        let mut selected: Vec<(usize, f32)> = Vec::with_capacity(k.min(pool_size));

        while selected.len() < k && !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_score = f32::NEG_INFINITY;

            for (pos, &(candidate, relevance)) in remaining.iter().enumerate() {
                let redundancy = selected
                    .iter()
                    .map(|&(s, _)| cosine_similarity(&self.vectors[candidate], &self.vectors[s]))
                    .fold(0.0f32, f32::max);
                let score = lambda * relevance - (1.0 - lambda) * redundancy;
                if score > best_score {
                    best_score = score;
                    best_pos = pos;
                }
            }

            selected.push(remaining.remove(best_pos));
        }

        selected
    }

    /// Serialize the index to `<dir>/<sanitize_key(key)>.json`.
    pub fn save(&self, dir: &Path, key: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = index_path(dir, key);

        let file = IndexFile {
            format_version: FORMAT_VERSION,
            document_id: self.document_id.clone(),
            document_name: self.document_name.clone(),
            model: self.model.clone(),
            dims: self.dims,
            created_at: Utc::now(),
            chunks: self
                .chunks
                .iter()
                .zip(self.vectors.iter())
                .map(|(chunk, vector)| StoredChunk {
                    chunk: chunk.clone(),
                    vector: BASE64.encode(vec_to_blob(vector)),
                })
                .collect(),
        };

        let json = serde_json::to_string(&file)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load a previously saved index. Returns `Ok(None)` when no index
    /// exists under `key`; a present-but-unreadable file is an error.
    pub fn load(dir: &Path, key: &str) -> Result<Option<VectorIndex>> {
        let path = index_path(dir, key);
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path)?;
        let file: IndexFile = serde_json::from_str(&json)?;

        if file.format_version != FORMAT_VERSION {
            return Err(Error::Persist(format!(
                "unsupported index format version {} in {}",
                file.format_version,
                path.display()
            )));
        }

        let mut chunks = Vec::with_capacity(file.chunks.len());
        let mut vectors = Vec::with_capacity(file.chunks.len());
        for stored in file.chunks {
            let blob = BASE64
                .decode(&stored.vector)
                .map_err(|e| Error::Persist(format!("corrupt vector in {}: {}", key, e)))?;
            vectors.push(blob_to_vec(&blob));
            chunks.push(stored.chunk);
        }

        Self::build(
            &file.document_id,
            &file.document_name,
            &file.model,
            file.dims,
            chunks,
            vectors,
        )
        .map(Some)
    }
}

fn index_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", sanitize_key(key)))
}

/// Filesystem-safe form of a document name: every non-alphanumeric
/// character becomes `_`, so keys can never escape the index directory
/// or hit illegal-character failures.
pub fn sanitize_key(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    fn chunk(i: i64, text: &str) -> Chunk {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Chunk {
            id: format!("chunk-{}", i),
            document_id: "doc1".to_string(),
            chunk_index: i,
            text: text.to_string(),
            source: "test.pdf".to_string(),
            page: 1,
            hash: format!("{:x}", hasher.finalize()),
        }
    }

    fn fixture() -> VectorIndex {
        // Two near-duplicate chunks pointing the same way, two distinct.
        let chunks = vec![
            chunk(0, "mitochondria produce energy"),
            chunk(1, "mitochondria generate energy"),
            chunk(2, "ribosomes synthesize proteins"),
            chunk(3, "the nucleus stores DNA"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.98, 0.2, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        VectorIndex::build("doc1", "test.pdf", "test-model", 3, chunks, vectors).unwrap()
    }

    #[test]
    fn build_rejects_count_mismatch() {
        let err = VectorIndex::build(
            "doc1",
            "test.pdf",
            "m",
            3,
            vec![chunk(0, "a")],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Ingest(_)));
    }

    #[test]
    fn build_rejects_dims_mismatch() {
        let err = VectorIndex::build(
            "doc1",
            "test.pdf",
            "m",
            3,
            vec![chunk(0, "a")],
            vec![vec![1.0, 2.0]],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Ingest(_)));
    }

    #[test]
    fn similarity_orders_by_score() {
        let index = fixture();
        let results = index.search(&[1.0, 0.05, 0.0], 2, SearchMode::Similarity);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.chunk_index, 0);
        assert_eq!(results[1].0.chunk_index, 1);
        assert!(results[0].1 >= results[1].1);
    }

    #[test]
    fn search_caps_at_index_size_without_duplicates() {
        let index = fixture();
        for mode in [SearchMode::Similarity, SearchMode::Mmr { lambda: 0.6 }] {
            let results = index.search(&[1.0, 0.0, 0.0], 50, mode);
            assert_eq!(results.len(), 4);
            let mut ids: Vec<&str> = results.iter().map(|(c, _)| c.id.as_str()).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), 4, "duplicate chunk in results");
        }
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index =
            VectorIndex::build("doc1", "empty.pdf", "m", 3, Vec::new(), Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index
            .search(&[1.0, 0.0, 0.0], 5, SearchMode::Similarity)
            .is_empty());
    }

    fn avg_pairwise_similarity(index: &VectorIndex, picked: &[(Chunk, f32)]) -> f32 {
        let vectors: Vec<&Vec<f32>> = picked
            .iter()
            .map(|(c, _)| &index.vectors[c.chunk_index as usize])
            .collect();
        let mut total = 0.0;
        let mut pairs = 0;
        for i in 0..vectors.len() {
            for j in (i + 1)..vectors.len() {
                total += cosine_similarity(vectors[i], vectors[j]);
                pairs += 1;
            }
        }
        total / pairs as f32
    }

    #[test]
    fn mmr_is_more_diverse_than_similarity() {
        let index = fixture();
        let query = [1.0, 0.1, 0.1];

        let top = index.search(&query, 3, SearchMode::Similarity);
        let mmr = index.search(&query, 3, SearchMode::Mmr { lambda: 0.5 });
        assert_eq!(top.len(), 3);
        assert_eq!(mmr.len(), 3);

        // Similarity mode returns both near-duplicates; MMR must not.
        let top_avg = avg_pairwise_similarity(&index, &top);
        let mmr_avg = avg_pairwise_similarity(&index, &mmr);
        assert!(
            mmr_avg < top_avg,
            "expected MMR diversity: mmr={} similarity={}",
            mmr_avg,
            top_avg
        );
    }

    #[test]
    fn mmr_first_pick_is_most_relevant() {
        let index = fixture();
        let results = index.search(&[1.0, 0.0, 0.0], 2, SearchMode::Mmr { lambda: 0.6 });
        assert_eq!(results[0].0.chunk_index, 0);
    }

    #[test]
    fn save_load_roundtrip_preserves_search_behavior() {
        let tmp = TempDir::new().unwrap();
        let index = fixture();
        let query = [0.7, 0.6, 0.2];

        index.save(tmp.path(), "test.pdf").unwrap();
        let loaded = VectorIndex::load(tmp.path(), "test.pdf")
            .unwrap()
            .expect("index should exist");

        assert_eq!(loaded.document_id(), index.document_id());
        assert_eq!(loaded.model(), "test-model");
        assert_eq!(loaded.len(), index.len());

        for mode in [SearchMode::Similarity, SearchMode::Mmr { lambda: 0.6 }] {
            let before = index.search(&query, 3, mode);
            let after = loaded.search(&query, 3, mode);
            let before_ids: Vec<&str> = before.iter().map(|(c, _)| c.id.as_str()).collect();
            let after_ids: Vec<&str> = after.iter().map(|(c, _)| c.id.as_str()).collect();
            assert_eq!(before_ids, after_ids, "order changed across roundtrip");
        }
    }

    #[test]
    fn load_missing_key_is_none() {
        let tmp = TempDir::new().unwrap();
        let loaded = VectorIndex::load(tmp.path(), "never-saved.pdf").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_index_file_is_persist_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad_pdf.json"), "{ not json").unwrap();
        let err = VectorIndex::load(tmp.path(), "bad.pdf").unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
    }

    #[test]
    fn sanitize_key_replaces_non_alphanumerics() {
        assert_eq!(sanitize_key("My Thesis (v2).pdf"), "My_Thesis__v2__pdf");
        assert_eq!(sanitize_key("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_key("plain"), "plain");
    }
}
