//! End-to-end pipeline tests.
//!
//! Runs the full ingest → retrieve → generate flow against synthesized
//! PDFs, with a deterministic bag-of-words embedder and a scripted
//! generation backend injected through the library's provider traits.
//! No network access.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use pdf_scholar::assistant::Assistant;
use pdf_scholar::config::Config;
use pdf_scholar::embedding::EmbeddingProvider;
use pdf_scholar::error::{Error, Result};
use pdf_scholar::generate::GenerationBackend;

/// Build a minimal valid PDF with one page per entry in `pages`.
/// Body objects are written first, then an xref with correct byte
/// offsets so pdf-extract can parse it. Page text must not contain
/// parentheses.
fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let n = pages.len();
    let mut out: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();

    out.extend_from_slice(b"%PDF-1.4\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");

    offsets.push(out.len());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids.join(" "),
            n
        )
        .as_bytes(),
    );

    let font_id = 3 + 2 * n;
    for (i, text) in pages.iter().enumerate() {
        let page_id = 3 + 2 * i;
        let content_id = 4 + 2 * i;

        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >> endobj\n",
                page_id, content_id, font_id
            )
            .as_bytes(),
        );

        let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET\n", text);
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}endstream endobj\n",
                content_id,
                stream.len(),
                stream
            )
            .as_bytes(),
        );
    }

    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "{} 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
            font_id
        )
        .as_bytes(),
    );

    let xref_start = out.len();
    let size = font_id + 1;
    out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for off in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, xref_start
        )
        .as_bytes(),
    );
    out
}

/// Deterministic bag-of-words embedder: each word hashes (FNV-1a) into
/// one of 32 buckets. Same text always maps to the same vector, and
/// texts sharing words land near each other.
#[derive(Debug)]
struct HashEmbedder;

const HASH_DIMS: usize = 32;

fn word_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; HASH_DIMS];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut h: u32 = 2166136261;
        for b in word.bytes() {
            h ^= b as u32;
            h = h.wrapping_mul(16777619);
        }
        v[(h % HASH_DIMS as u32) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-test"
    }
    fn dims(&self) -> usize {
        HASH_DIMS
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| word_vector(t)).collect())
    }
}

/// Scripted backend: records every prompt it receives and returns a
/// fixed reply.
#[derive(Debug)]
struct RecordingBackend {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl GenerationBackend for RecordingBackend {
    fn model_name(&self) -> &str {
        "recording-test"
    }
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Backend that always fails, as a rate-limited/unreachable service would.
#[derive(Debug)]
struct FailingBackend;

#[async_trait]
impl GenerationBackend for FailingBackend {
    fn model_name(&self) -> &str {
        "failing-test"
    }
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::Backend("chat API error 500: upstream failure".to_string()))
    }
}

fn test_config(tmp: &TempDir) -> Config {
    let mut config = Config::minimal();
    config.storage.data_dir = tmp.path().to_path_buf();
    config
}

fn scripted_assistant(tmp: &TempDir, reply: &str) -> (Assistant, Arc<Mutex<Vec<String>>>) {
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let backend = RecordingBackend {
        reply: reply.to_string(),
        prompts: prompts.clone(),
    };
    let assistant = Assistant::with_backends(
        test_config(tmp),
        Box::new(HashEmbedder),
        Box::new(backend),
    )
    .unwrap();
    (assistant, prompts)
}

const MITO_TEXT: &str =
    "The mitochondria is the powerhouse of the cell. It produces ATP through respiration.";

#[tokio::test]
async fn embedding_same_text_twice_gives_same_vector() {
    let embedder = HashEmbedder;
    let a = embedder.embed_query(MITO_TEXT).await.unwrap();
    let b = embedder.embed_query(MITO_TEXT).await.unwrap();
    assert_eq!(a, b);

    let batch = embedder
        .embed_batch(&[MITO_TEXT.to_string()])
        .await
        .unwrap();
    assert_eq!(batch[0], a);
}

#[tokio::test]
async fn one_page_document_yields_one_chunk_and_grounded_answer() {
    let tmp = TempDir::new().unwrap();
    let (mut assistant, prompts) = scripted_assistant(
        &tmp,
        "The mitochondria produces ATP through respiration, as stated on page 1.",
    );

    let handle = assistant
        .ingest("biology.pdf", &build_pdf(&[MITO_TEXT]))
        .await
        .unwrap();
    assert_eq!(handle.page_count, 1);
    assert_eq!(handle.chunk_count, 1, "short page must produce one chunk");

    let answer = assistant
        .answer("biology.pdf", "What does the mitochondria produce?")
        .await
        .unwrap();
    assert!(answer.contains("ATP"));

    // The backend saw the retrieved context, labeled with its page.
    let seen = prompts.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("powerhouse"));
    assert!(seen[0].contains("[biology.pdf, page 1]"));
    assert!(seen[0].contains("What does the mitochondria produce?"));
}

#[tokio::test]
async fn unknown_document_returns_guidance_without_touching_backend() {
    let tmp = TempDir::new().unwrap();
    let (assistant, prompts) = scripted_assistant(&tmp, "should never be returned");

    let reply = assistant
        .answer("never-ingested.pdf", "What is this?")
        .await
        .unwrap();
    assert!(reply.contains("has been ingested"));
    assert!(prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_pdf_does_not_block_the_rest_of_a_batch() {
    let tmp = TempDir::new().unwrap();
    let (mut assistant, _prompts) = scripted_assistant(&tmp, "grounded answer with ATP");

    let err = assistant
        .ingest("corrupt.pdf", b"this is not a pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Ingest(_)));

    let handle = assistant
        .ingest("biology.pdf", &build_pdf(&[MITO_TEXT]))
        .await
        .unwrap();
    assert_eq!(handle.chunk_count, 1);

    // The valid document is fully queryable afterward.
    let answer = assistant
        .answer("biology.pdf", "What does the mitochondria produce?")
        .await
        .unwrap();
    assert!(answer.contains("ATP"));

    // Only the valid document made it into the catalog.
    assert_eq!(assistant.documents().len(), 1);
    assert_eq!(assistant.documents()[0].name, "biology.pdf");
}

#[tokio::test]
async fn empty_document_summary_is_explicit_not_silent() {
    let tmp = TempDir::new().unwrap();
    let (mut assistant, prompts) = scripted_assistant(&tmp, "should never be returned");

    let handle = assistant
        .ingest("blank.pdf", &build_pdf(&[""]))
        .await
        .unwrap();
    assert_eq!(handle.chunk_count, 0);

    let reply = assistant.summarize("blank.pdf").await.unwrap();
    assert!(reply.contains("Insufficient content"));
    assert!(!reply.trim().is_empty());
    assert!(prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn persisted_index_survives_a_new_session() {
    let tmp = TempDir::new().unwrap();

    {
        let (mut assistant, _prompts) = scripted_assistant(&tmp, "first session");
        assistant
            .ingest("biology.pdf", &build_pdf(&[MITO_TEXT]))
            .await
            .unwrap();
    }

    // A fresh assistant over the same data dir loads the catalog and
    // index from disk without re-embedding the document.
    let (assistant, prompts) = scripted_assistant(&tmp, "ATP, loaded from disk");
    let answer = assistant
        .answer("biology.pdf", "What does the mitochondria produce?")
        .await
        .unwrap();
    assert!(answer.contains("ATP"));
    assert!(prompts.lock().unwrap()[0].contains("powerhouse"));
}

#[tokio::test]
async fn re_ingesting_a_name_replaces_the_document() {
    let tmp = TempDir::new().unwrap();
    let (mut assistant, _prompts) = scripted_assistant(&tmp, "ok");

    assistant
        .ingest("notes.pdf", &build_pdf(&[MITO_TEXT]))
        .await
        .unwrap();
    assistant
        .ingest("notes.pdf", &build_pdf(&["Completely new content about ribosomes.", "And a second page."]))
        .await
        .unwrap();

    assert_eq!(assistant.documents().len(), 1);
    assert_eq!(assistant.documents()[0].page_count, 2);
}

#[tokio::test]
async fn backend_failure_is_a_readable_error_not_content() {
    let tmp = TempDir::new().unwrap();
    let mut assistant = Assistant::with_backends(
        test_config(&tmp),
        Box::new(HashEmbedder),
        Box::new(FailingBackend),
    )
    .unwrap();

    assistant
        .ingest("biology.pdf", &build_pdf(&[MITO_TEXT]))
        .await
        .unwrap();

    let err = assistant
        .answer("biology.pdf", "What does the mitochondria produce?")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Backend(_)));
    assert!(err.to_string().contains("backend error"));
}

#[tokio::test]
async fn summary_and_notes_use_their_templates() {
    let tmp = TempDir::new().unwrap();
    let (mut assistant, prompts) = scripted_assistant(&tmp, "generated output");

    assistant
        .ingest(
            "cells.pdf",
            &build_pdf(&[
                "Mitochondria produce energy for the cell.",
                "Ribosomes synthesize proteins from amino acids.",
                "The nucleus stores genetic material as DNA.",
            ]),
        )
        .await
        .unwrap();

    assistant.summarize("cells.pdf").await.unwrap();
    assistant.make_notes("cells.pdf").await.unwrap();

    let seen = prompts.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].contains("Summary:"));
    assert!(seen[1].contains("Key Takeaways"));
    assert!(seen[1].contains("Study Notes:"));
}

#[tokio::test]
async fn leading_probe_selects_document_order_context() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.retrieval.probe = "leading".to_string();
    config.retrieval.summary_k = 2;

    let prompts = Arc::new(Mutex::new(Vec::new()));
    let mut assistant = Assistant::with_backends(
        config,
        Box::new(HashEmbedder),
        Box::new(RecordingBackend {
            reply: "summary".to_string(),
            prompts: prompts.clone(),
        }),
    )
    .unwrap();

    assistant
        .ingest(
            "ordered.pdf",
            &build_pdf(&[
                "Opening chapter about photosynthesis.",
                "Middle chapter about respiration.",
                "Closing chapter about fermentation.",
            ]),
        )
        .await
        .unwrap();

    assistant.summarize("ordered.pdf").await.unwrap();

    let seen = prompts.lock().unwrap();
    assert!(seen[0].contains("photosynthesis"));
    assert!(seen[0].contains("respiration"));
    // k = 2: the closing chapter is outside the leading window.
    assert!(!seen[0].contains("fermentation"));
}

#[tokio::test]
async fn preview_shows_labeled_opening_pages() {
    let tmp = TempDir::new().unwrap();
    let (mut assistant, _prompts) = scripted_assistant(&tmp, "ok");

    assistant
        .ingest(
            "long.pdf",
            &build_pdf(&[
                "First page content.",
                "Second page content.",
                "Third page content.",
                "Fourth page content.",
            ]),
        )
        .await
        .unwrap();

    let preview = assistant.preview("long.pdf", 3).unwrap();
    assert!(preview.contains("--- Page 1 ---"));
    assert!(preview.contains("--- Page 3 ---"));
    assert!(!preview.contains("--- Page 4 ---"));
    assert!(preview.contains("First page content"));
}

#[tokio::test]
async fn selector_accepts_id_and_unique_prefix() {
    let tmp = TempDir::new().unwrap();
    let (mut assistant, _prompts) = scripted_assistant(&tmp, "ATP answer");

    let handle = assistant
        .ingest("biology.pdf", &build_pdf(&[MITO_TEXT]))
        .await
        .unwrap();

    let by_id = assistant.answer(&handle.id, "mitochondria?").await.unwrap();
    assert!(by_id.contains("ATP"));

    let by_prefix = assistant.answer("bio", "mitochondria?").await.unwrap();
    assert!(by_prefix.contains("ATP"));
}
