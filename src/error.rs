//! Error taxonomy for the study pipeline.
//!
//! Errors are scoped: ingestion failures abort only the offending
//! document, query/generation failures surface as readable values at the
//! CLI boundary. No error is swallowed into a successful-looking empty
//! result.

/// All failure kinds produced by the core pipeline.
#[derive(Debug)]
pub enum Error {
    /// Extraction or indexing of one document failed. Other documents in
    /// the same batch are unaffected.
    Ingest(String),
    /// The embedding model resource is unreachable or misconfigured.
    /// Callers must not proceed with zero vectors.
    EmbeddingUnavailable(String),
    /// A query addressed a document that was never ingested or whose
    /// index is missing from disk.
    IndexNotFound(String),
    /// A backend call exceeded its configured time budget.
    BackendTimeout(String),
    /// The generation backend rejected or failed the request.
    Backend(String),
    /// Invalid configuration (e.g. `chunk_overlap >= chunk_size`).
    Config(String),
    /// Reading or writing a persisted index or the library catalog failed.
    Persist(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Ingest(e) => write!(f, "ingest failed: {}", e),
            Error::EmbeddingUnavailable(e) => write!(f, "embedding unavailable: {}", e),
            Error::IndexNotFound(e) => write!(f, "index not found: {}", e),
            Error::BackendTimeout(e) => write!(f, "backend timed out: {}", e),
            Error::Backend(e) => write!(f, "backend error: {}", e),
            Error::Config(e) => write!(f, "invalid configuration: {}", e),
            Error::Persist(e) => write!(f, "persistence error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persist(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Persist(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
