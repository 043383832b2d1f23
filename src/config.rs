//! TOML configuration.
//!
//! Only `[corpus].root` is required; every other setting has a default.
//! Relative `root`, `store_dir`, and `extra_files` paths resolve against the
//! directory containing the config file, so a config works regardless of the
//! directory `ragline` is launched from.
//!
//! ```toml
//! [corpus]
//! root = "./docs"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use ragline_core::chunk::{validate_window, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use ragline_core::search::DEFAULT_TOP_K;

use crate::error::RaglineError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Extra local files to index, e.g. attachments fetched from a task board.
    #[serde(default)]
    pub extra_files: Vec<PathBuf>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

fn default_extensions() -> Vec<String> {
    vec![
        ".md".to_string(),
        ".py".to_string(),
        ".txt".to_string(),
        ".json".to_string(),
    ]
}
fn default_store_dir() -> PathBuf {
    PathBuf::from(".ragline")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL override (OpenAI-compatible gateway or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default = "default_synthesis_provider")]
    pub provider: String,
    #[serde(default = "default_synthesis_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_synthesis_retries")]
    pub max_retries: u32,
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: default_synthesis_provider(),
            model: default_synthesis_model(),
            url: None,
            api_key_env: default_api_key_env(),
            max_retries: default_synthesis_retries(),
            timeout_secs: default_synthesis_timeout(),
            temperature: 0.0,
        }
    }
}

fn default_synthesis_provider() -> String {
    "openai".to_string()
}
fn default_synthesis_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_synthesis_retries() -> u32 {
    2
}
fn default_synthesis_timeout() -> u64 {
    60
}

impl CorpusConfig {
    /// Extensions normalized to lowercase with a leading dot.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| e.len() > 1)
            .collect()
    }
}

/// `"MD"`, `"md"`, and `".md"` all become `".md"`.
pub fn normalize_extension(ext: &str) -> String {
    format!(".{}", ext.trim().trim_start_matches('.').to_lowercase())
}

/// Read, parse, and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_config(&content, base)
}

/// Parse and validate config text, resolving relative paths against `base`.
pub fn parse_config(content: &str, base: &Path) -> Result<Config> {
    let mut config: Config = toml::from_str(content)
        .map_err(|e| RaglineError::config(format!("Failed to parse config file: {}", e)))?;

    config.corpus.root = resolve(base, &config.corpus.root);
    config.corpus.store_dir = resolve(base, &config.corpus.store_dir);
    config.corpus.extra_files = config
        .corpus
        .extra_files
        .iter()
        .map(|p| resolve(base, p))
        .collect();

    validate(&config)?;
    Ok(config)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn validate(config: &Config) -> Result<(), RaglineError> {
    validate_window(config.chunking.size, config.chunking.overlap)
        .map_err(|e| RaglineError::config(format!("chunking: {}", e)))?;

    if config.corpus.normalized_extensions().is_empty() {
        return Err(RaglineError::config(
            "corpus.extensions must list at least one extension",
        ));
    }
    if config.retrieval.top_k < 1 {
        return Err(RaglineError::config("retrieval.top_k must be >= 1"));
    }
    if config.embedding.batch_size < 1 {
        return Err(RaglineError::config("embedding.batch_size must be >= 1"));
    }
    if config.embedding.dims == Some(0) {
        return Err(RaglineError::config("embedding.dims must be > 0"));
    }

    match config.embedding.provider.as_str() {
        "local" | "openai" | "ollama" => {}
        other => {
            return Err(RaglineError::config(format!(
                "Unknown embedding provider: '{}'. Must be local, openai, or ollama.",
                other
            )))
        }
    }
    if config.embedding.provider != "local" {
        if config.embedding.model.is_none() {
            return Err(RaglineError::config(format!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            )));
        }
        if config.embedding.dims.is_none() {
            return Err(RaglineError::config(format!(
                "embedding.dims must be specified when provider is '{}'",
                config.embedding.provider
            )));
        }
    }

    match config.synthesis.provider.as_str() {
        "openai" | "ollama" => Ok(()),
        other => Err(RaglineError::config(format!(
            "Unknown synthesis provider: '{}'. Must be openai or ollama.",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Config> {
        parse_config(toml, Path::new("/srv/project/config"))
    }

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = parse("[corpus]\nroot = \"../docs\"\n").unwrap();
        assert_eq!(cfg.corpus.root, PathBuf::from("/srv/project/config/../docs"));
        assert_eq!(
            cfg.corpus.store_dir,
            PathBuf::from("/srv/project/config/.ragline")
        );
        assert_eq!(cfg.chunking.size, 1000);
        assert_eq!(cfg.chunking.overlap, 200);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.embedding.provider, "local");
        assert_eq!(cfg.synthesis.provider, "openai");
        assert_eq!(
            cfg.corpus.normalized_extensions(),
            vec![".md", ".py", ".txt", ".json"]
        );
    }

    #[test]
    fn test_absolute_paths_untouched() {
        let cfg = parse("[corpus]\nroot = \"/data/docs\"\nstore_dir = \"/var/ragline\"\n").unwrap();
        assert_eq!(cfg.corpus.root, PathBuf::from("/data/docs"));
        let store = crate::store::CorpusStore::new(&cfg.corpus.store_dir);
        assert_eq!(store.dir(), Path::new("/var/ragline"));
    }

    #[test]
    fn test_missing_root_rejected() {
        assert!(parse("[chunking]\nsize = 10\n").is_err());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let err = parse("[corpus]\nroot = \"d\"\n[chunking]\nsize = 100\noverlap = 100\n")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RaglineError>(),
            Some(RaglineError::Configuration(_))
        ));
    }

    #[test]
    fn test_remote_provider_requires_model_and_dims() {
        assert!(parse("[corpus]\nroot = \"d\"\n[embedding]\nprovider = \"openai\"\n").is_err());
        assert!(parse(
            "[corpus]\nroot = \"d\"\n[embedding]\nprovider = \"openai\"\nmodel = \"m\"\ndims = 8\n"
        )
        .is_ok());
    }

    #[test]
    fn test_unknown_providers_rejected() {
        assert!(parse("[corpus]\nroot = \"d\"\n[embedding]\nprovider = \"magic\"\n").is_err());
        assert!(parse("[corpus]\nroot = \"d\"\n[synthesis]\nprovider = \"magic\"\n").is_err());
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("MD"), ".md");
        assert_eq!(normalize_extension(".Py"), ".py");
        assert_eq!(normalize_extension(" txt "), ".txt");
    }
}
