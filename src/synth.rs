//! Answer synthesis via an external completion service.
//!
//! [`synthesize`] is the user-facing entry point: it builds the grounding
//! prompt, calls the configured provider, and always returns printable text.
//! Failures become a message starting with [`FAILURE_PREFIX`] and are logged;
//! the caller never has to handle an error from this stage.
//!
//! | Provider | Endpoint |
//! |----------|----------|
//! | `openai` | `POST {url}/v1/chat/completions` |
//! | `ollama` | `POST {url}/api/generate` (`stream: false`) |

use tracing::{debug, warn};

use ragline_core::prompt::build_prompt;

use crate::config::SynthesisConfig;
use crate::error::RaglineError;
use crate::http;

pub const FAILURE_PREFIX: &str = "Unable to generate an answer: ";
pub const NO_CONTEXT_ANSWER: &str =
    "No relevant context was found in the corpus, so no answer can be given.";

/// Answer `query` from `context_chunks`.
///
/// Empty context short-circuits to [`NO_CONTEXT_ANSWER`] without calling the
/// service.
pub async fn synthesize<S: AsRef<str>>(
    config: &SynthesisConfig,
    query: &str,
    context_chunks: &[S],
) -> String {
    if context_chunks.is_empty() {
        return NO_CONTEXT_ANSWER.to_string();
    }

    let prompt = build_prompt(query, context_chunks);
    match complete(config, &prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!("answer synthesis failed: {}", e);
            format!("{}{}", FAILURE_PREFIX, e)
        }
    }
}

/// Send `prompt` to the configured completion provider.
pub async fn complete(config: &SynthesisConfig, prompt: &str) -> Result<String, RaglineError> {
    match config.provider.as_str() {
        "openai" => complete_openai(config, prompt).await,
        "ollama" => complete_ollama(config, prompt).await,
        other => Err(RaglineError::config(format!(
            "Unknown synthesis provider: {}",
            other
        ))),
    }
}

async fn complete_openai(config: &SynthesisConfig, prompt: &str) -> Result<String, RaglineError> {
    let api_key = http::credential(&config.api_key_env).ok_or_else(|| {
        RaglineError::config(format!(
            "{} environment variable not set (required for answer generation)",
            config.api_key_env
        ))
    })?;

    let base = config.url.as_deref().unwrap_or(http::OPENAI_URL);
    let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));
    let body = serde_json::json!({
        "model": config.model,
        "temperature": config.temperature,
        "messages": [{"role": "user", "content": prompt}],
    });

    let json = post(config, &url, Some(&api_key), &body, "OpenAI").await?;
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| {
            RaglineError::SynthesisService("invalid OpenAI response: missing message content".into())
        })
}

async fn complete_ollama(config: &SynthesisConfig, prompt: &str) -> Result<String, RaglineError> {
    let base = config.url.as_deref().unwrap_or(http::OLLAMA_URL);
    let url = format!("{}/api/generate", base.trim_end_matches('/'));
    let body = serde_json::json!({
        "model": config.model,
        "prompt": prompt,
        "stream": false,
        "options": {"temperature": config.temperature},
    });

    let json = post(config, &url, None, &body, "Ollama").await?;
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| {
            RaglineError::SynthesisService("invalid Ollama response: missing response".into())
        })
}

async fn post(
    config: &SynthesisConfig,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    service: &str,
) -> Result<serde_json::Value, RaglineError> {
    debug!(service, model = %config.model, "requesting completion");
    let client = http::client(config.timeout_secs)
        .map_err(|e| RaglineError::SynthesisService(e.to_string()))?;
    http::post_json(&client, url, bearer, body, config.max_retries, service)
        .await
        .map_err(|e| RaglineError::SynthesisService(e.to_string()))
}
