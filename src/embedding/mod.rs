//! Embedding provider implementations.
//!
//! Concrete backends for the [`EmbeddingProvider`] trait defined in
//! `ragline-core`:
//! - **[`OpenAIProvider`]**: calls the OpenAI embeddings API (or any
//!   OpenAI-compatible gateway via `embedding.url`).
//! - **[`OllamaProvider`]**: calls a local Ollama instance's `/api/embed`.
//! - **`LocalProvider`**: runs models in-process via fastembed; no network
//!   calls after the model is downloaded (feature `local-embeddings`).
//!
//! Remote providers share the retry policy in [`crate::http`].
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use ragline::config::EmbeddingConfig;
//! # use ragline::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "local"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "all-minilm-l6-v2");
//! ```

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

pub use ragline_core::embedding::EmbeddingProvider;

use crate::config::EmbeddingConfig;
use crate::error::RaglineError;
use crate::http;

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST {url}/v1/embeddings`. The credential is read from the
/// environment variable named by `embedding.api_key_env`.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// # Errors
    ///
    /// Returns a configuration error if `model` or `dims` is not set, or if
    /// the credential variable is missing.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = remote_model(config, "OpenAI")?;
        let api_key = http::credential(&config.api_key_env).ok_or_else(|| {
            RaglineError::config(format!(
                "{} environment variable not set (required by the OpenAI embedding provider)",
                config.api_key_env
            ))
        })?;

        Ok(Self {
            model,
            dims,
            url: config.url.clone().unwrap_or_else(|| http::OPENAI_URL.to_string()),
            api_key,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/v1/embeddings", self.url.trim_end_matches('/'));
        debug!(count = texts.len(), "embedding batch via OpenAI");

        let json = http::post_json(
            &self.client,
            &url,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await
        .map_err(|e| RaglineError::EmbeddingService(e.to_string()))?;

        Ok(parse_openai_response(&json)?)
    }
}

/// Parse the OpenAI embeddings response.
///
/// Extracts `data[].embedding`, ordered by each item's `index` so the
/// output lines up with the input even if the API reorders items.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RaglineError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| invalid("OpenAI", "missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| invalid("OpenAI", "missing embedding"))?;
        indexed.push((index, to_f32_vec(embedding)));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on `embedding.url` (default
/// `http://localhost:11434`). Requires an embedding model to be pulled,
/// e.g. `ollama pull nomic-embed-text`.
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = remote_model(config, "Ollama")?;
        Ok(Self {
            model,
            dims,
            url: config.url.clone().unwrap_or_else(|| http::OLLAMA_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/api/embed", self.url.trim_end_matches('/'));
        debug!(count = texts.len(), "embedding batch via Ollama");

        let json = http::post_json(&self.client, &url, None, &body, self.max_retries, "Ollama")
            .await
            .map_err(|e| RaglineError::EmbeddingService(e.to_string()))?;

        Ok(parse_ollama_response(&json)?)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RaglineError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| invalid("Ollama", "missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            embedding
                .as_array()
                .map(|values| to_f32_vec(values))
                .ok_or_else(|| invalid("Ollama", "embedding is not an array"))
        })
        .collect()
}

// ============ Local Provider (fastembed) ============

/// Embedding provider for in-process inference via fastembed.
///
/// The model is downloaded from Hugging Face on first use and cached; after
/// that, embeddings run entirely offline. The loaded model is kept for the
/// lifetime of the provider so batches do not reload it.
#[cfg(feature = "local-embeddings")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: std::sync::Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config);
        // Reject unknown names up front rather than on the first batch.
        config_to_fastembed_model(&model_name)?;
        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: std::sync::Arc::new(std::sync::Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let fastembed_model = config_to_fastembed_model(&self.model_name)?;
        let slot = self.model.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = slot
                .lock()
                .map_err(|_| anyhow::anyhow!("local embedding model lock poisoned"))?;
            if guard.is_none() {
                let loaded = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
                )
                .map_err(|e| {
                    RaglineError::EmbeddingService(format!(
                        "failed to initialize local embedding model: {}",
                        e
                    ))
                })?;
                *guard = Some(loaded);
            }
            let model = guard
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("local embedding model not loaded"))?;
            let embeddings = model.embed(texts, Some(batch_size)).map_err(|e| {
                RaglineError::EmbeddingService(format!("local embedding failed: {}", e))
            })?;
            Ok::<_, anyhow::Error>(embeddings)
        })
        .await?
    }
}

/// Model name and dimensionality for the local provider. An explicit
/// `embedding.dims` wins over the built-in table.
pub fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| "all-minilm-l6-v2".to_string());

    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "bge-base-en-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        "multilingual-e5-base" => 768,
        "multilingual-e5-large" => 1024,
        _ => 384,
    });

    (model_name, dims)
}

#[cfg(feature = "local-embeddings")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => Err(RaglineError::config(format!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ))
        .into()),
    }
}

/// Create the [`EmbeddingProvider`] named by `embedding.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"local"` | `LocalProvider` (fastembed) |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
///
/// # Errors
///
/// Returns a configuration error for unknown providers or when the provider
/// cannot be initialized (missing model, dims, credential, or feature).
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Box::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => Err(RaglineError::config(
            "Local embedding provider requires the `local-embeddings` feature",
        )
        .into()),
        other => Err(RaglineError::config(format!("Unknown embedding provider: {}", other)).into()),
    }
}

/// Model identifier the configured provider would report, without building it.
///
/// Used to check a stored corpus against the config before paying for
/// provider construction.
pub fn configured_model(config: &EmbeddingConfig) -> (String, Option<usize>) {
    match config.provider.as_str() {
        "local" => {
            let (name, dims) = resolve_local_model(config);
            (name, Some(dims))
        }
        _ => (config.model.clone().unwrap_or_default(), config.dims),
    }
}

fn remote_model(config: &EmbeddingConfig, service: &str) -> Result<(String, usize), RaglineError> {
    let model = config.model.clone().ok_or_else(|| {
        RaglineError::config(format!("embedding.model required for {} provider", service))
    })?;
    let dims = config.dims.ok_or_else(|| {
        RaglineError::config(format!("embedding.dims required for {} provider", service))
    })?;
    Ok((model, dims))
}

fn to_f32_vec(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

fn invalid(service: &str, what: &str) -> RaglineError {
    RaglineError::EmbeddingService(format!("invalid {} response: {}", service, what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_openai_orders_by_index() {
        let json = json!({
            "data": [
                {"index": 1, "embedding": [0.5, 0.5]},
                {"index": 0, "embedding": [1.0, -1.0]},
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0, -1.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn test_parse_openai_missing_data() {
        assert!(parse_openai_response(&json!({"error": "nope"})).is_err());
    }

    #[test]
    fn test_parse_ollama() {
        let json = json!({"embeddings": [[0.25, 0.75], [1.0, 0.0]]});
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.25, 0.75]);
        assert!(parse_ollama_response(&json!({"embeddings": [1.0]})).is_err());
    }

    #[test]
    fn test_openai_requires_credential() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: Some("text-embedding-3-small".to_string()),
            dims: Some(1536),
            api_key_env: "RAGLINE_TEST_UNSET_EMBEDDING_KEY".to_string(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RaglineError>(),
            Some(RaglineError::Configuration(_))
        ));
    }

    #[test]
    fn test_local_model_dims_table() {
        let mut config = EmbeddingConfig::default();
        assert_eq!(resolve_local_model(&config), ("all-minilm-l6-v2".to_string(), 384));
        config.model = Some("bge-base-en-v1.5".to_string());
        assert_eq!(resolve_local_model(&config).1, 768);
        config.dims = Some(512);
        assert_eq!(resolve_local_model(&config).1, 512);
    }

    #[test]
    fn test_configured_model_remote() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("nomic-embed-text".to_string()),
            dims: Some(768),
            ..Default::default()
        };
        assert_eq!(
            configured_model(&config),
            ("nomic-embed-text".to_string(), Some(768))
        );
    }
}
