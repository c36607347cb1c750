use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::EmbeddingError;

/// Converts text into a fixed-dimension vector.
pub trait Embedder: Send + Sync {
    /// Embeds `text`. No retry is performed here.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

#[derive(Debug, Clone)]
/// Settings for [`HttpEmbedder`].
pub struct HttpEmbedderConfig {
    /// Full URL of the `/v1/embeddings` endpoint.
    pub url: String,
    /// Model name sent with each request.
    pub model: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Client-side request timeout.
    pub timeout: Duration,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Client for OpenAI-compatible embedding endpoints (OpenAI, Ollama, vLLM, TEI).
#[derive(Clone)]
pub struct HttpEmbedder {
    http: HttpClient,
    config: HttpEmbedderConfig,
}

impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("url", &self.config.url)
            .field("model", &self.config.model)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, EmbeddingError> {
        if config.url.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding url is empty".to_string(),
            });
        }

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpEmbedderConfig {
        &self.config
    }
}

impl Embedder for HttpEmbedder {
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.config.model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self.http.post(&self.config.url).json(&EmbedRequest {
            model: &self.config.model,
            input: [text],
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse = response.json().await?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse {
                reason: "response contained no embeddings".to_string(),
            })?;

        debug!(dim = embedding.len(), "Embedding received");
        Ok(embedding)
    }
}
