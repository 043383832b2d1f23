//! # Ragline Core
//!
//! Shared logic for Ragline: data models, sliding-window chunking, the
//! flat vector index, the embedding provider trait, retrieval, and the
//! grounding prompt.
//!
//! This crate performs no filesystem or network I/O. Persistence, concrete
//! embedding providers, and the completion service live in the `ragline`
//! app crate.

pub mod chunk;
pub mod corpus;
pub mod embedding;
pub mod index;
pub mod models;
pub mod prompt;
pub mod search;
