//! # ragline
//!
//! A local retrieval-augmented lookup tool: point it at a directory of text
//! documents, build a vector index over overlapping chunks once, then ask
//! natural-language questions answered from the most relevant chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Discovery  │──▶│ Chunk+Embed  │──▶│ Corpus store │
//! │  walkdir    │   │ (batched)    │   │ index.bin +  │
//! └─────────────┘   └──────────────┘   │ chunks.json  │
//!                                      └──────┬───────┘
//!                                             │
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                   ┌───────────┐      ┌─────────────┐
//!                   │ Retriever │─────▶│ Synthesizer │
//!                   │  top-K    │      │ completion  │
//!                   └───────────┘      └─────────────┘
//! ```
//!
//! The pure pieces (chunker, flat index, retriever, prompt template) live in
//! `ragline-core`; this crate adds the I/O around them.
//!
//! ## Quick Start
//!
//! ```bash
//! ragline prepare                        # build the corpus
//! ragline query "How do I configure X?"  # ask a question
//! ragline query "X" --no-answer          # show ranked chunks only
//! ragline status                         # what is indexed
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed pipeline errors |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`discover`] | Document discovery |
//! | [`embedding`] | OpenAI, Ollama, and local embedding providers |
//! | [`http`] | JSON POST with retry and backoff |
//! | [`store`] | Corpus persistence |
//! | [`synth`] | Answer synthesis |
//! | [`prepare`] | Build pipeline |
//! | [`query`] | Query pipeline |
//! | [`status`] | Store overview |

pub mod config;
pub mod discover;
pub mod embedding;
pub mod error;
pub mod http;
pub mod logging;
pub mod prepare;
pub mod query;
pub mod status;
pub mod store;
pub mod synth;
