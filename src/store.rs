//! Corpus store: the persisted pair of vector index and chunk sidecar.
//!
//! Two artifacts live side by side in the store directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `index.bin` | [`FlatIndex`] bytes, one row per chunk |
//! | `chunks.json` | chunk texts and `{source, chunk_index}` metadata in row order, plus the embedding model, dims, and the SHA-256 of `index.bin` |
//!
//! ```json
//! {
//!   "chunks": ["...", "..."],
//!   "metadata": [{"source": "docs/a.md", "chunk_index": 0}, ...],
//!   "model": "all-minilm-l6-v2",
//!   "dims": 384,
//!   "index_sha256": "9f2c…",
//!   "built_at": "2026-01-01T00:00:00Z"
//! }
//! ```
//!
//! Each build writes its pair into a fresh generation directory, and the
//! `CURRENT` pointer file names the live one:
//!
//! ```text
//! <store_dir>/
//!   CURRENT                 "gen-6f1c…"
//!   gen-6f1c…/index.bin
//!   gen-6f1c…/chunks.json
//! ```
//!
//! A build stages both files in an unreferenced generation, then commits by
//! renaming a new pointer over `CURRENT`. That rename is the only step that
//! changes what `load` sees, so a build that fails or crashes at any earlier
//! point leaves the previous pair loadable. Superseded generations are
//! removed after the commit.
//!
//! The sidecar still records the checksum of its index, so a pair edited by
//! hand after the fact loads as corruption rather than as chunks attributed
//! to the wrong vectors.
//!
//! There is no lock: two concurrent `prepare` runs against the same store
//! race, and the last writer wins.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use ragline_core::corpus::Corpus;
use ragline_core::index::FlatIndex;
use ragline_core::models::Chunk;

use crate::error::RaglineError;

pub const INDEX_FILE: &str = "index.bin";
pub const SIDECAR_FILE: &str = "chunks.json";
pub const CURRENT_FILE: &str = "CURRENT";
const GENERATION_PREFIX: &str = "gen-";

/// Provenance of one row, as stored in `chunks.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: usize,
}

/// The `chunks.json` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub chunks: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub dims: usize,
    #[serde(default)]
    pub index_sha256: Option<String>,
    #[serde(default)]
    pub built_at: Option<DateTime<Utc>>,
}

/// Summary of a persisted corpus, readable without loading the index.
#[derive(Debug, Clone)]
pub struct StoreInfo {
    pub chunk_count: usize,
    pub source_count: usize,
    pub model: String,
    pub dims: usize,
    pub built_at: Option<DateTime<Utc>>,
    pub index_bytes: u64,
}

/// Handle to a store directory.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    dir: PathBuf,
}

impl CorpusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `index.bin` of the live generation, if one is committed.
    pub fn index_path(&self) -> Option<PathBuf> {
        self.live_generation().ok().flatten().map(|g| g.join(INDEX_FILE))
    }

    /// `chunks.json` of the live generation, if one is committed.
    pub fn sidecar_path(&self) -> Option<PathBuf> {
        self.live_generation().ok().flatten().map(|g| g.join(SIDECAR_FILE))
    }

    /// True when a generation is committed and both of its artifacts exist.
    pub fn exists(&self) -> bool {
        self.require_built().is_ok()
    }

    /// Write `corpus`, replacing whatever the store held before.
    ///
    /// The previous corpus stays loadable until the new one is committed.
    pub fn persist(&self, corpus: &Corpus) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store directory: {}", self.dir.display()))?;

        let generation = self.stage(corpus)?;
        self.commit(&generation)?;
        self.prune_generations(&generation);

        info!(
            rows = corpus.len(),
            dims = corpus.index().dims(),
            dir = %self.dir.display(),
            "corpus persisted"
        );
        Ok(())
    }

    /// Write both artifacts into a new, unreferenced generation directory.
    fn stage(&self, corpus: &Corpus) -> Result<PathBuf> {
        let index_bytes = corpus.index().to_bytes();
        let sidecar = Sidecar {
            chunks: corpus.chunks().iter().map(|c| c.text.clone()).collect(),
            metadata: corpus
                .chunks()
                .iter()
                .map(|c| ChunkMetadata {
                    source: c.source_path.clone(),
                    chunk_index: c.chunk_index,
                })
                .collect(),
            model: corpus.model().to_string(),
            dims: corpus.index().dims(),
            index_sha256: Some(sha256_hex(&index_bytes)),
            built_at: Some(Utc::now()),
        };
        let sidecar_bytes = serde_json::to_vec_pretty(&sidecar)?;

        let generation = self
            .dir
            .join(format!("{}{}", GENERATION_PREFIX, Uuid::new_v4()));
        let written = fs::create_dir(&generation)
            .map_err(anyhow::Error::from)
            .and_then(|_| write_file(&generation.join(INDEX_FILE), &index_bytes))
            .and_then(|_| write_file(&generation.join(SIDECAR_FILE), &sidecar_bytes));

        if let Err(e) = written {
            let _ = fs::remove_dir_all(&generation);
            return Err(e.context(format!(
                "Failed to stage corpus in {}",
                generation.display()
            )));
        }
        debug!(generation = %generation.display(), "corpus staged");
        Ok(generation)
    }

    /// Point `CURRENT` at `generation` with a single rename.
    fn commit(&self, generation: &Path) -> Result<()> {
        let name = generation
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let pointer_tmp = self
            .dir
            .join(format!(".{}.{}.tmp", CURRENT_FILE, Uuid::new_v4()));
        let current = self.dir.join(CURRENT_FILE);

        let committed = write_file(&pointer_tmp, name.as_bytes()).and_then(|_| {
            fs::rename(&pointer_tmp, &current)
                .with_context(|| format!("Failed to replace {}", current.display()))
        });

        if let Err(e) = committed {
            let _ = fs::remove_file(&pointer_tmp);
            let _ = fs::remove_dir_all(generation);
            return Err(e);
        }
        Ok(())
    }

    /// Remove every generation other than `keep`, plus stray pointer files.
    /// Failures are logged, not returned.
    fn prune_generations(&self, keep: &Path) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("could not list store directory for cleanup: {}", e);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path == keep {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let removed = if name.starts_with(GENERATION_PREFIX) && path.is_dir() {
                fs::remove_dir_all(&path)
            } else if name.starts_with('.') && name.ends_with(".tmp") {
                fs::remove_file(&path)
            } else {
                continue;
            };
            if let Err(e) = removed {
                warn!(path = %path.display(), "could not remove superseded store entry: {}", e);
            }
        }
    }

    /// Load the corpus, enforcing the pairing invariants.
    ///
    /// # Errors
    ///
    /// - [`RaglineError::CorpusNotBuilt`] if nothing is committed or either
    ///   artifact is missing.
    /// - [`RaglineError::CorpusCorruption`] if the artifacts cannot be decoded
    ///   or disagree (row count, checksum, dims).
    pub fn load(&self) -> Result<Corpus> {
        let generation = self.require_built()?;
        let index_path = generation.join(INDEX_FILE);

        let index_bytes = fs::read(&index_path)
            .with_context(|| format!("Failed to read {}", index_path.display()))?;
        let sidecar = read_sidecar(&generation)?;

        if let Some(expected) = &sidecar.index_sha256 {
            if *expected != sha256_hex(&index_bytes) {
                return Err(corrupt("index.bin does not match the checksum recorded in chunks.json"));
            }
        }

        let index = FlatIndex::from_bytes(&index_bytes)
            .map_err(|e| corrupt(format!("index.bin: {}", e)))?;

        if sidecar.chunks.len() != sidecar.metadata.len() {
            return Err(corrupt(format!(
                "chunks.json lists {} chunks but {} metadata entries",
                sidecar.chunks.len(),
                sidecar.metadata.len()
            )));
        }
        if index.len() != sidecar.chunks.len() {
            return Err(corrupt(format!(
                "index has {} rows but chunks.json lists {} chunks",
                index.len(),
                sidecar.chunks.len()
            )));
        }
        if sidecar.dims != 0 && sidecar.dims != index.dims() {
            return Err(corrupt(format!(
                "index has {} dimensions but chunks.json records {}",
                index.dims(),
                sidecar.dims
            )));
        }

        let chunks: Vec<Chunk> = sidecar
            .chunks
            .into_iter()
            .zip(sidecar.metadata)
            .map(|(text, meta)| Chunk {
                text,
                source_path: meta.source,
                chunk_index: meta.chunk_index,
            })
            .collect();

        Corpus::new(index, chunks, sidecar.model).map_err(|e| corrupt(e.to_string()))
    }

    /// Read the sidecar only, for status reporting.
    pub fn info(&self) -> Result<StoreInfo> {
        let generation = self.require_built()?;
        let sidecar = read_sidecar(&generation)?;
        let index_bytes = fs::metadata(generation.join(INDEX_FILE))
            .map(|m| m.len())
            .unwrap_or(0);

        let mut sources: Vec<&str> = sidecar.metadata.iter().map(|m| m.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();

        Ok(StoreInfo {
            chunk_count: sidecar.chunks.len(),
            source_count: sources.len(),
            model: sidecar.model.clone(),
            dims: sidecar.dims,
            built_at: sidecar.built_at,
            index_bytes,
        })
    }

    /// The generation directory `CURRENT` names, or `None` before the first
    /// commit.
    fn live_generation(&self) -> Result<Option<PathBuf>> {
        let current = self.dir.join(CURRENT_FILE);
        if !current.is_file() {
            return Ok(None);
        }
        let name = fs::read_to_string(&current)
            .with_context(|| format!("Failed to read {}", current.display()))?;
        let name = name.trim();
        let valid = name.starts_with(GENERATION_PREFIX)
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        if !valid {
            return Err(corrupt(format!("{} names an invalid generation '{}'", CURRENT_FILE, name)));
        }
        Ok(Some(self.dir.join(name)))
    }

    fn require_built(&self) -> Result<PathBuf> {
        match self.live_generation()? {
            Some(generation)
                if generation.join(INDEX_FILE).is_file()
                    && generation.join(SIDECAR_FILE).is_file() =>
            {
                Ok(generation)
            }
            _ => Err(RaglineError::CorpusNotBuilt {
                dir: self.dir.clone(),
            }
            .into()),
        }
    }
}

fn read_sidecar(generation: &Path) -> Result<Sidecar> {
    let path = generation.join(SIDECAR_FILE);
    let raw = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).map_err(|e| corrupt(format!("chunks.json: {}", e)))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn corrupt(msg: impl Into<String>) -> anyhow::Error {
    RaglineError::CorpusCorruption(msg.into()).into()
}
