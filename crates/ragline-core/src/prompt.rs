//! Grounding prompt construction for answer synthesis.
//!
//! The prompt restates the question, lists the retrieved passages in
//! retrieval order, and instructs the model to answer only from them.

/// Separator placed between retrieved passages in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Join passages into a single context block, keeping their order.
pub fn join_context<S: AsRef<str>>(context_chunks: &[S]) -> String {
    context_chunks
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Build the fixed-template instruction prompt for `query`.
///
/// ```rust
/// use ragline_core::prompt::build_prompt;
///
/// let prompt = build_prompt("What is a chunk?", &["A chunk is a window."]);
/// assert!(prompt.contains("Question: What is a chunk?"));
/// assert!(prompt.contains("A chunk is a window."));
/// ```
pub fn build_prompt<S: AsRef<str>>(query: &str, context_chunks: &[S]) -> String {
    format!(
        "Answer the question using only the context below. \
         If the context does not contain the answer, say that you don't know \
         instead of guessing.\n\n\
         Question: {}\n\n\
         Context:\n{}\n\n\
         Answer:",
        query.trim(),
        join_context(context_chunks)
    )
}
