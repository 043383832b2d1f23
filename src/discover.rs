//! Document discovery.
//!
//! Walks the configured root, keeps files whose extension is in the accepted
//! set, and reads them as UTF-8 text. Files that cannot be read are logged
//! and skipped; they never abort a build. The corpus store directory is
//! always pruned from the walk so a rebuild never indexes its own output.
//!
//! Documents are returned sorted by path, which fixes chunk and row order
//! for the whole build.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use ragline_core::models::Document;

use crate::config::{normalize_extension, CorpusConfig};
use crate::error::RaglineError;

/// Directory names never descended into.
const DEFAULT_EXCLUDED_DIRS: &[&str] = &[".git", "target", "node_modules"];

/// Knobs for [`discover`] beyond the root and extension set.
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Globs matched against the path relative to the root.
    pub exclude_globs: Vec<String>,
    /// Directories to prune from the walk (the corpus store).
    pub exclude_dirs: Vec<PathBuf>,
    /// Additional files outside the walk, e.g. downloaded attachments.
    pub extra_files: Vec<PathBuf>,
    pub follow_symlinks: bool,
}

impl DiscoverOptions {
    pub fn from_config(corpus: &CorpusConfig) -> Self {
        Self {
            exclude_globs: corpus.exclude_globs.clone(),
            exclude_dirs: vec![corpus.store_dir.clone()],
            extra_files: corpus.extra_files.clone(),
            follow_symlinks: corpus.follow_symlinks,
        }
    }
}

/// Discover every eligible document under `root`.
///
/// # Errors
///
/// Fails with [`RaglineError::Configuration`] if `root` is missing or not a
/// directory, or if an exclude glob is invalid. Unreadable files are not
/// errors.
pub fn discover(
    root: &Path,
    extensions: &[String],
    options: &DiscoverOptions,
) -> Result<Vec<Document>> {
    if !root.is_dir() {
        return Err(RaglineError::config(format!(
            "corpus root does not exist or is not a directory: {}",
            root.display()
        ))
        .into());
    }

    let accepted: HashSet<String> = extensions.iter().map(|e| normalize_extension(e)).collect();
    let exclude_set = build_globset(&options.exclude_globs)?;
    let pruned: Vec<PathBuf> = options
        .exclude_dirs
        .iter()
        .map(|d| canonical_or_self(d))
        .collect();

    let mut seen = HashSet::new();
    let mut documents = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_pruned(e, &pruned));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable path during discovery: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) {
            debug!(path = %path.display(), "excluded by glob");
            continue;
        }

        push_document(path, &accepted, &mut seen, &mut documents);
    }

    for extra in &options.extra_files {
        if !extra.is_file() {
            warn!(path = %extra.display(), "extra file not found, skipping");
            continue;
        }
        push_document(extra, &accepted, &mut seen, &mut documents);
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(documents)
}

/// Discover using the `[corpus]` section of the config.
pub fn discover_corpus(corpus: &CorpusConfig) -> Result<Vec<Document>> {
    discover(
        &corpus.root,
        &corpus.normalized_extensions(),
        &DiscoverOptions::from_config(corpus),
    )
}

fn push_document(
    path: &Path,
    accepted: &HashSet<String>,
    seen: &mut HashSet<PathBuf>,
    documents: &mut Vec<Document>,
) {
    let Some(extension) = extension_of(path) else {
        return;
    };
    if !accepted.contains(&extension) {
        return;
    }
    if !seen.insert(canonical_or_self(path)) {
        return;
    }

    match read_document(path, extension) {
        Ok(doc) if doc.content.is_empty() => {
            debug!(path = %path.display(), "empty file, nothing to index");
        }
        Ok(doc) => documents.push(doc),
        Err(e) => warn!("{}; skipping", e),
    }
}

fn read_document(path: &Path, extension: String) -> Result<Document, RaglineError> {
    let bytes = std::fs::read(path).map_err(|e| RaglineError::DocumentRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let content = String::from_utf8(bytes).map_err(|_| RaglineError::DocumentRead {
        path: path.to_path_buf(),
        reason: "not valid UTF-8 text".to_string(),
    })?;
    Ok(Document {
        path: path.to_path_buf(),
        content,
        extension,
    })
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
}

fn is_pruned(entry: &DirEntry, pruned: &[PathBuf]) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if DEFAULT_EXCLUDED_DIRS.contains(&name.as_ref()) {
        return true;
    }
    let path = canonical_or_self(entry.path());
    pruned.iter().any(|p| *p == path)
}

fn canonical_or_self(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            RaglineError::config(format!("invalid exclude glob '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
