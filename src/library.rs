//! Document catalog with JSON persistence.
//!
//! The [`Library`] is an explicit store object (no process-global
//! registry) mapping generated document UUIDs to their persisted index
//! keys. The display name is metadata: re-ingesting a file with the
//! same name replaces its catalog entry and index (last-writer-wins),
//! rather than silently colliding on the raw filename.
//!
//! Persisted as a single `library.json` manifest so CLI invocations
//! compose across processes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// One cataloged document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Generated UUID; the authoritative identity.
    pub id: String,
    /// Display name (usually the uploaded filename).
    pub name: String,
    pub page_count: usize,
    pub chunk_count: usize,
    /// Sanitized key of the persisted vector index.
    pub index_key: String,
    /// Embedding model the index was built with.
    pub embedding_model: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Default)]
struct Manifest {
    documents: Vec<CatalogEntry>,
}

/// The document catalog, backed by a JSON manifest on disk.
#[derive(Debug)]
pub struct Library {
    path: PathBuf,
    entries: Vec<CatalogEntry>,
}

impl Library {
    /// Open (or create) the catalog at `path`.
    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            let manifest: Manifest = serde_json::from_str(&json)
                .map_err(|e| Error::Persist(format!("corrupt library manifest: {}", e)))?;
            manifest.documents
        } else {
            Vec::new()
        };

        Ok(Self { path, entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Insert an entry, replacing any existing document with the same
    /// display name (last-writer-wins), then persist the manifest.
    pub fn upsert(&mut self, entry: CatalogEntry) -> Result<()> {
        self.entries.retain(|e| e.name != entry.name);
        self.entries.push(entry);
        self.save()
    }

    /// Resolve a document selector: exact UUID, exact name, then unique
    /// name prefix. Ambiguous prefixes resolve to nothing.
    pub fn find(&self, selector: &str) -> Option<&CatalogEntry> {
        if let Some(entry) = self.entries.iter().find(|e| e.id == selector) {
            return Some(entry);
        }
        if let Some(entry) = self.entries.iter().find(|e| e.name == selector) {
            return Some(entry);
        }

        let mut matches = self.entries.iter().filter(|e| e.name.starts_with(selector));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let manifest = Manifest {
            documents: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
