//! # PDF Scholar
//!
//! A local-first PDF study assistant. Upload PDFs, ask questions,
//! generate summaries and study notes — all grounded in your own
//! documents via retrieval-augmented generation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌──────────────┐   ┌─────────────┐
//! │  PDF    │──▶│   Pipeline    │──▶│ VectorIndex │
//! │  bytes  │   │ Extract+Chunk │   │  (per doc,  │
//! └─────────┘   │    +Embed     │   │  persisted) │
//!               └──────────────┘   └──────┬──────┘
//!                                         │
//!                  query ──▶ Retriever ───┤
//!                                         ▼
//!                                 ┌──────────────┐
//!                                 │ Orchestrator  │──▶ answer /
//!                                 │ prompt + LLM  │    summary /
//!                                 └──────────────┘    notes
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! scholar ingest thesis.pdf            # extract, chunk, embed, index
//! scholar ask thesis "What is MMR?"    # grounded question answering
//! scholar summarize thesis             # structured summary
//! scholar notes thesis                 # Markdown study notes
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF page-text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Per-document vector index (similarity + MMR) |
//! | [`retrieve`] | Query-time retrieval |
//! | [`prompt`] | Generation prompt templates |
//! | [`generate`] | Generation backend abstraction |
//! | [`library`] | Document catalog |
//! | [`assistant`] | Pipeline orchestration |
//! | [`progress`] | Ingest progress reporting |

pub mod assistant;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generate;
pub mod index;
pub mod library;
pub mod models;
pub mod progress;
pub mod prompt;
pub mod retrieve;
