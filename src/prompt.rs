//! Prompt templates for the three generation flows.
//!
//! Each template fixes the output contract for its mode: answers are
//! grounded in the supplied context only (with an explicit fallback
//! phrase when the context is insufficient), summaries are structured
//! prose, and notes are Markdown with hierarchical headings and a
//! closing "Key Takeaways" section.
//!
//! Context is assembled from retrieved chunks, each labeled with its
//! source name and page number so the model can cite pages.

use crate::models::Chunk;

/// The exact fallback phrase the answer template instructs the model to
/// use when the context does not contain the answer.
pub const INSUFFICIENT_CONTEXT_FALLBACK: &str =
    "I don't have enough information to answer this question.";

/// Concatenate retrieved chunk texts into a labeled context block.
pub fn build_context(chunks: &[(Chunk, f32)]) -> String {
    chunks
        .iter()
        .map(|(c, _)| format!("[{}, page {}]\n{}", c.source, c.page, c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Question-answering prompt: answer only from context, cite pages.
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful academic assistant that answers questions based on the provided context.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Instructions:\n\
         - Answer the question based only on the provided context\n\
         - If the context doesn't contain the answer, say \"{fallback}\"\n\
         - Be concise and accurate\n\
         - Use specific examples from the context when appropriate\n\
         - Cite the page number when referencing specific information (e.g., \"According to page 3...\")\n\
         \n\
         Answer:",
        context = context,
        question = question,
        fallback = INSUFFICIENT_CONTEXT_FALLBACK,
    )
}

/// Summarization prompt: structured prose over the retrieved content.
pub fn summary_prompt(context: &str) -> String {
    format!(
        "You are an expert at summarizing academic content.\n\
         \n\
         Content to summarize:\n\
         {context}\n\
         \n\
         Instructions:\n\
         - Provide a comprehensive summary of the provided content\n\
         - Identify and include the key points, main ideas, and essential information\n\
         - Organize the summary in a logical structure\n\
         - Keep the summary informative yet concise\n\
         - Maintain the academic tone of the original content\n\
         \n\
         Summary:",
        context = context,
    )
}

/// Study-notes prompt: Markdown with headings and a Key Takeaways tail.
pub fn notes_prompt(context: &str) -> String {
    format!(
        "You are an expert at creating study notes for students.\n\
         \n\
         Content to convert to notes:\n\
         {context}\n\
         \n\
         Instructions:\n\
         - Create comprehensive study notes from the provided content\n\
         - Structure the notes with clear headings, subheadings, and bullet points\n\
         - Include all important concepts, definitions, theories, and examples\n\
         - Organize information hierarchically with main points and supporting details\n\
         - Format in Markdown with proper headers (##, ###), bullet points, and emphasis\n\
         - Include any relevant formulas, diagram descriptions, or key quotations\n\
         - Add a \"Key Takeaways\" section at the end\n\
         \n\
         Study Notes:",
        context = context,
    )
}
