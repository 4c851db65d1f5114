//! Pipeline orchestration.
//!
//! [`Assistant`] wires the whole flow together: extraction → chunking →
//! embedding → index build/persist on the ingest side, and retrieval →
//! prompt assembly → generation on the query side. Configuration and
//! both backends are threaded in explicitly at construction; there is
//! no ambient global state.
//!
//! Failure semantics at this layer:
//! - A document that was never ingested resolves to a guidance message,
//!   not an error — the user asked a reasonable question and needs to
//!   be told what to do next.
//! - A document with no extractable text resolves to an explicit
//!   "insufficient content" message, never an empty success.
//! - Backend failures propagate as typed errors so the CLI can print
//!   them distinctly from generated content.
//!
//! Re-ingesting a document name replaces its index and catalog entry
//! (last-writer-wins); the one-command-per-process CLI serializes this.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::chunk;
use crate::config::{self, Config};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::extract;
use crate::generate::{self, GenerationBackend};
use crate::index::{sanitize_key, SearchMode, VectorIndex};
use crate::library::{CatalogEntry, Library};
use crate::models::DocumentHandle;
use crate::progress::{IngestProgressEvent, IngestProgressReporter, NoProgress};
use crate::prompt;
use crate::retrieve::{self, Probe, NOTES_PROBE, SUMMARY_PROBE};

/// Guidance returned when a selector matches no cataloged document.
pub fn no_document_message(selector: &str) -> String {
    format!(
        "No document matching '{}' has been ingested. Run `scholar ingest <file.pdf>` first, then try again.",
        selector
    )
}

/// Explicit result for documents with no extractable text.
pub fn insufficient_content_message(name: &str) -> String {
    format!(
        "Insufficient content: '{}' has no extractable text to work with.",
        name
    )
}

/// The study assistant: one instance per session, operating over the
/// document library in `storage.data_dir`.
pub struct Assistant {
    config: Config,
    embedder: Box<dyn EmbeddingProvider>,
    backend: Box<dyn GenerationBackend>,
    library: Library,
    /// Indexes already loaded this session, by document id. Indexes are
    /// read-only after build; concurrent searches share them via `Arc`.
    indexes: RwLock<HashMap<String, Arc<VectorIndex>>>,
    reporter: Box<dyn IngestProgressReporter>,
}

impl Assistant {
    /// Create an assistant with providers resolved from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let embedder = embedding::create_provider(&config.embedding)?;
        let backend = generate::create_backend(&config.generation)?;
        Self::with_backends(config, embedder, backend)
    }

    /// Create an assistant with explicit backends. This is the seam the
    /// tests use to run the full pipeline without network access.
    pub fn with_backends(
        config: Config,
        embedder: Box<dyn EmbeddingProvider>,
        backend: Box<dyn GenerationBackend>,
    ) -> Result<Self> {
        config::validate(&config).map_err(|e| Error::Config(e.to_string()))?;
        let library = Library::open(config.storage.library_path())?;

        Ok(Self {
            config,
            embedder,
            backend,
            library,
            indexes: RwLock::new(HashMap::new()),
            reporter: Box::new(NoProgress),
        })
    }

    /// Replace the progress reporter (the CLI passes a TTY-gated one).
    pub fn with_progress(mut self, reporter: Box<dyn IngestProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Cataloged documents, in ingest order.
    pub fn documents(&self) -> &[CatalogEntry] {
        self.library.entries()
    }

    /// Ingest one document: extract, chunk, embed, index, persist,
    /// catalog. Errors abort only this document; callers ingesting a
    /// batch continue with the rest.
    pub async fn ingest(&mut self, name: &str, bytes: &[u8]) -> Result<DocumentHandle> {
        let document_id = Uuid::new_v4().to_string();

        self.reporter.report(IngestProgressEvent::Extracting {
            name: name.to_string(),
        });
        let pages = extract::extract_pages(name, bytes)?;

        self.reporter.report(IngestProgressEvent::Chunking {
            name: name.to_string(),
            pages: pages.len(),
        });
        let chunks = chunk::split_pages(
            &document_id,
            name,
            &pages,
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        )?;

        let total = chunks.len() as u64;
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.config.embedding.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let batch_vectors = self.embedder.embed_batch(&texts).await?;
            vectors.extend(batch_vectors);
            self.reporter.report(IngestProgressEvent::Embedding {
                name: name.to_string(),
                n: vectors.len() as u64,
                total,
            });
        }

        let chunk_count = chunks.len();
        let index = VectorIndex::build(
            &document_id,
            name,
            self.embedder.model_name(),
            self.embedder.dims(),
            chunks,
            vectors,
        )?;
        index.save(&self.config.storage.index_dir(), name)?;
        self.reporter.report(IngestProgressEvent::Indexed {
            name: name.to_string(),
            chunks: chunk_count,
        });

        let entry = CatalogEntry {
            id: document_id.clone(),
            name: name.to_string(),
            page_count: pages.len(),
            chunk_count,
            index_key: sanitize_key(name),
            embedding_model: self.embedder.model_name().to_string(),
            ingested_at: Utc::now(),
        };
        self.library.upsert(entry)?;

        self.indexes
            .write()
            .unwrap()
            .insert(document_id.clone(), Arc::new(index));

        Ok(DocumentHandle {
            id: document_id,
            name: name.to_string(),
            page_count: pages.len(),
            chunk_count,
        })
    }

    /// Answer a question grounded in one document's content.
    pub async fn answer(&self, selector: &str, question: &str) -> Result<String> {
        let Some(entry) = self.library.find(selector).cloned() else {
            return Ok(no_document_message(selector));
        };
        let index = match self.open_index(&entry) {
            Ok(index) => index,
            Err(Error::IndexNotFound(_)) => return Ok(no_document_message(selector)),
            Err(e) => return Err(e),
        };
        if index.is_empty() {
            return Ok(insufficient_content_message(&entry.name));
        }

        let retrieved = retrieve::retrieve(
            &index,
            self.embedder.as_ref(),
            question,
            self.config.retrieval.answer_k,
            self.mmr(),
        )
        .await?;

        let context = prompt::build_context(&retrieved);
        if context.trim().is_empty() {
            return Ok(insufficient_content_message(&entry.name));
        }

        self.backend
            .generate(&prompt::answer_prompt(&context, question))
            .await
    }

    /// Generate a structured prose summary of one document.
    pub async fn summarize(&self, selector: &str) -> Result<String> {
        self.synthesize(
            selector,
            SUMMARY_PROBE,
            self.config.retrieval.summary_k,
            prompt::summary_prompt,
        )
        .await
    }

    /// Generate Markdown study notes for one document.
    pub async fn make_notes(&self, selector: &str) -> Result<String> {
        self.synthesize(
            selector,
            NOTES_PROBE,
            self.config.retrieval.notes_k,
            prompt::notes_prompt,
        )
        .await
    }

    /// Shared summary/notes flow: select context per the configured
    /// probe policy, fill the template, invoke the backend.
    async fn synthesize(
        &self,
        selector: &str,
        probe_text: &str,
        k: usize,
        template: fn(&str) -> String,
    ) -> Result<String> {
        let Some(entry) = self.library.find(selector).cloned() else {
            return Ok(no_document_message(selector));
        };
        let index = match self.open_index(&entry) {
            Ok(index) => index,
            Err(Error::IndexNotFound(_)) => return Ok(no_document_message(selector)),
            Err(e) => return Err(e),
        };
        if index.is_empty() {
            return Ok(insufficient_content_message(&entry.name));
        }

        let retrieved = match Probe::from_config(&self.config.retrieval.probe) {
            Probe::Literal => {
                retrieve::retrieve(&index, self.embedder.as_ref(), probe_text, k, self.mmr())
                    .await?
            }
            Probe::Leading => retrieve::leading_chunks(&index, k),
        };

        let context = prompt::build_context(&retrieved);
        if context.trim().is_empty() {
            return Ok(insufficient_content_message(&entry.name));
        }

        self.backend.generate(&template(&context)).await
    }

    /// Preview the opening pages of a document, original-page-labeled
    /// and truncated, for `scholar show`.
    pub fn preview(&self, selector: &str, max_pages: usize) -> Result<String> {
        let Some(entry) = self.library.find(selector).cloned() else {
            return Ok(no_document_message(selector));
        };
        let index = match self.open_index(&entry) {
            Ok(index) => index,
            Err(Error::IndexNotFound(_)) => return Ok(no_document_message(selector)),
            Err(e) => return Err(e),
        };
        if index.is_empty() {
            return Ok(insufficient_content_message(&entry.name));
        }

        let mut out = String::new();
        let mut seen_pages = Vec::new();
        for chunk in index.chunks() {
            if seen_pages.contains(&chunk.page) {
                continue;
            }
            if seen_pages.len() >= max_pages {
                break;
            }
            seen_pages.push(chunk.page);

            let excerpt: String = chunk.text.chars().take(500).collect();
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&format!("--- Page {} ---\n{}...", chunk.page, excerpt));
        }

        Ok(out)
    }

    fn mmr(&self) -> SearchMode {
        SearchMode::Mmr {
            lambda: self.config.retrieval.mmr_lambda,
        }
    }

    /// Fetch a document's index, from the session cache or disk.
    fn open_index(&self, entry: &CatalogEntry) -> Result<Arc<VectorIndex>> {
        if let Some(index) = self.indexes.read().unwrap().get(&entry.id) {
            return Ok(index.clone());
        }

        let loaded = VectorIndex::load(&self.config.storage.index_dir(), &entry.index_key)?
            .ok_or_else(|| {
                Error::IndexNotFound(format!(
                    "no persisted index for '{}' (key {})",
                    entry.name, entry.index_key
                ))
            })?;

        // Stored vectors are only comparable with queries embedded by
        // the same model.
        if !loaded.is_empty() && loaded.model() != self.embedder.model_name() {
            return Err(Error::Config(format!(
                "index for '{}' was built with embedding model '{}' but '{}' is configured; re-ingest the document",
                entry.name,
                loaded.model(),
                self.embedder.model_name()
            )));
        }

        let index = Arc::new(loaded);
        self.indexes
            .write()
            .unwrap()
            .insert(entry.id.clone(), index.clone());
        Ok(index)
    }
}
