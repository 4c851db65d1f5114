//! # PDF Scholar CLI (`scholar`)
//!
//! The `scholar` binary is the primary interface for PDF Scholar. It
//! provides commands for ingesting PDF documents and for generating
//! grounded answers, summaries, and study notes from them.
//!
//! ## Usage
//!
//! ```bash
//! scholar --config ./config/scholar.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scholar ingest <files…>` | Extract, chunk, embed, and index PDFs |
//! | `scholar list` | List ingested documents |
//! | `scholar show <doc>` | Preview the opening pages of a document |
//! | `scholar ask <doc> "<question>"` | Answer a question from one document |
//! | `scholar summarize <doc>` | Generate a summary |
//! | `scholar notes <doc>` | Generate Markdown study notes |
//!
//! ## Examples
//!
//! ```bash
//! # Ingest a batch (one bad file does not block the others)
//! scholar ingest notes/*.pdf
//!
//! # Ask a question, citing pages
//! scholar ask biology "What does the mitochondria produce?"
//!
//! # Download-ready study notes
//! scholar notes biology > biology_notes.md
//! ```

mod assistant;
mod chunk;
mod config;
mod embedding;
mod error;
mod extract;
mod generate;
mod index;
mod library;
mod models;
mod progress;
mod prompt;
mod retrieve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::assistant::Assistant;
use crate::progress::ProgressMode;

/// PDF Scholar CLI — a local-first PDF study assistant.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. When the file does not exist, built-in defaults
/// apply (providers disabled, `./data` storage).
#[derive(Parser)]
#[command(
    name = "scholar",
    about = "PDF Scholar — grounded Q&A, summaries, and study notes over your own PDFs",
    version,
    long_about = "PDF Scholar ingests PDF documents into per-document vector indexes \
    (chunking, embedding, persistence) and generates answers, summaries, and study notes \
    grounded in the retrieved content via an OpenAI-compatible generation backend."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Storage, chunking, retrieval, embedding, and generation settings
    /// are read from this file.
    #[arg(long, global = true, default_value = "./config/scholar.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest one or more PDF documents.
    ///
    /// Each file is extracted, chunked, embedded, indexed, and
    /// cataloged independently: a corrupt file is reported and skipped
    /// without blocking the rest of the batch. Re-ingesting a name
    /// replaces its previous index.
    Ingest {
        /// PDF files to ingest.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Progress reporting on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// List ingested documents.
    List,

    /// Preview the opening pages of a document.
    Show {
        /// Document id, name, or unique name prefix.
        doc: String,
    },

    /// Answer a question grounded in one document.
    ///
    /// Retrieves the most relevant chunks (diversity-aware), assembles
    /// a context-only prompt, and prints the backend's answer with page
    /// citations.
    Ask {
        /// Document id, name, or unique name prefix.
        doc: String,
        /// The question to answer.
        question: String,
    },

    /// Generate a structured summary of a document.
    Summarize {
        /// Document id, name, or unique name prefix.
        doc: String,
    },

    /// Generate Markdown study notes for a document.
    ///
    /// Notes use hierarchical headings and end with a "Key Takeaways"
    /// section; pipe stdout to a file to keep them.
    Notes {
        /// Document id, name, or unique name prefix.
        doc: String,
    },
}

fn parse_progress(value: Option<&str>) -> anyhow::Result<ProgressMode> {
    match value {
        None => Ok(ProgressMode::default_for_tty()),
        Some("off") => Ok(ProgressMode::Off),
        Some("human") => Ok(ProgressMode::Human),
        Some("json") => Ok(ProgressMode::Json),
        Some(other) => anyhow::bail!("Unknown progress mode: {}. Use off, human, or json.", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()
    };

    match cli.command {
        Commands::Ingest { files, progress } => {
            let mode = parse_progress(progress.as_deref())?;
            let mut assistant = Assistant::new(cfg)?.with_progress(mode.reporter());

            let mut succeeded = 0u64;
            let mut failed = 0u64;

            for path in &files {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());

                let bytes = match std::fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        eprintln!("Error reading {}: {}", path.display(), e);
                        failed += 1;
                        continue;
                    }
                };

                match assistant.ingest(&name, &bytes).await {
                    Ok(handle) => {
                        println!(
                            "ingested {} ({} pages, {} chunks)",
                            handle.name, handle.page_count, handle.chunk_count
                        );
                        succeeded += 1;
                    }
                    Err(e) => {
                        eprintln!("Error processing {}: {}", name, e);
                        failed += 1;
                    }
                }
            }

            println!("ingest complete");
            println!("  succeeded: {}", succeeded);
            println!("  failed: {}", failed);

            if succeeded == 0 && failed > 0 {
                anyhow::bail!("no documents were ingested");
            }
        }
        Commands::List => {
            let assistant = Assistant::new(cfg)?;
            if assistant.documents().is_empty() {
                println!("No documents ingested yet.");
            } else {
                for entry in assistant.documents() {
                    println!(
                        "{}  {}  {} pages  {} chunks  model {}",
                        entry.id, entry.name, entry.page_count, entry.chunk_count,
                        entry.embedding_model
                    );
                }
            }
        }
        Commands::Show { doc } => {
            let assistant = Assistant::new(cfg)?;
            println!("{}", assistant.preview(&doc, 3)?);
        }
        Commands::Ask { doc, question } => {
            let assistant = Assistant::new(cfg)?;
            println!("{}", assistant.answer(&doc, &question).await?);
        }
        Commands::Summarize { doc } => {
            let assistant = Assistant::new(cfg)?;
            println!("{}", assistant.summarize(&doc).await?);
        }
        Commands::Notes { doc } => {
            let assistant = Assistant::new(cfg)?;
            println!("{}", assistant.make_notes(&doc).await?);
        }
    }

    Ok(())
}
