//! Core data models shared by the build and query pipelines.
//!
//! These types describe the documents read at build time, the chunks that
//! become index rows, and the ranked matches returned at query time.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single source file read during discovery.
///
/// Documents are ephemeral: they exist only while a build runs and are
/// never persisted. Only their chunks survive into the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path identifying the document (unique within a build).
    pub path: PathBuf,
    /// Full UTF-8 text of the file.
    pub content: String,
    /// Lowercased extension including the leading dot (e.g. `".md"`).
    pub extension: String,
}

impl Document {
    /// Path rendered as the `source` string stored in chunk metadata.
    pub fn source(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// A window of a document's text. The atomic unit of indexing.
///
/// Chunks are immutable once created. `chunk_index` is the 0-based position
/// of the window within its source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_path: String,
    pub chunk_index: usize,
}

/// A chunk matched by a query, with its index row and squared L2 distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub row: usize,
    pub distance: f32,
}
