//! Ingest progress reporting.
//!
//! Reports observable progress during `scholar ingest` so users see
//! which document is being processed and how far embedding has gotten.
//! Progress is emitted on **stderr** so stdout remains parseable for
//! scripts.

use std::io::Write;

/// A single progress event for one document's ingestion.
#[derive(Clone, Debug)]
pub enum IngestProgressEvent {
    /// Extracting page text from the PDF.
    Extracting { name: String },
    /// Pages extracted; chunking is about to run.
    Chunking { name: String, pages: usize },
    /// Embedding chunk batches: n of total chunks embedded so far.
    Embedding { name: String, n: u64, total: u64 },
    /// Index built and persisted.
    Indexed { name: String, chunks: usize },
}

/// Reports ingest progress. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the ingest pipeline.
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "ingest thesis.pdf  embedding  120 / 542 chunks".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Extracting { name } => {
                format!("ingest {}  extracting...\n", name)
            }
            IngestProgressEvent::Chunking { name, pages } => {
                format!("ingest {}  chunking  {} pages\n", name, pages)
            }
            IngestProgressEvent::Embedding { name, n, total } => {
                format!(
                    "ingest {}  embedding  {} / {} chunks\n",
                    name,
                    format_number(*n),
                    format_number(*total)
                )
            }
            IngestProgressEvent::Indexed { name, chunks } => {
                format!("ingest {}  indexed  {} chunks\n", name, chunks)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Extracting { name } => serde_json::json!({
                "event": "progress",
                "document": name,
                "phase": "extracting"
            }),
            IngestProgressEvent::Chunking { name, pages } => serde_json::json!({
                "event": "progress",
                "document": name,
                "phase": "chunking",
                "pages": pages
            }),
            IngestProgressEvent::Embedding { name, n, total } => serde_json::json!({
                "event": "progress",
                "document": name,
                "phase": "embedding",
                "n": n,
                "total": total
            }),
            IngestProgressEvent::Indexed { name, chunks } => serde_json::json!({
                "event": "progress",
                "document": name,
                "phase": "indexed",
                "chunks": chunks
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to ingest.
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
