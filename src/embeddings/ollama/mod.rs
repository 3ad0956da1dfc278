
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{Embedder, TextGenerator};
use crate::RagError;
use crate::config::OllamaConfig;

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Client for a local Ollama server, used both for embeddings and for answer generation
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    temperature: f32,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    model: &'a str,
    #[serde(rename = "input")]
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            temperature: config.temperature,
            batch_size: config.batch_size,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check that the server answers and both configured models are pulled
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models().context("Server ping failed")?;
        for model in [&self.embedding_model, &self.generation_model] {
            if !models.iter().any(|m| &m.name == model) {
                let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                warn!("Model {} not found. Available models: {:?}", model, available);
                return Err(anyhow::anyhow!(
                    "Model '{}' is not available. Available models: {:?}",
                    model,
                    available
                ));
            }
        }

        info!(
            "Health check passed for Ollama at {} (embedding: {}, generation: {})",
            self.base_url, self.embedding_model, self.generation_model
        );
        Ok(())
    }

    /// List all models the server has pulled
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;
        debug!("Fetching available models from {}", url);

        let body = self
            .with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let tags: ModelsResponse =
            serde_json::from_str(&body).context("Failed to parse models response")?;
        debug!("Server has {} models", tags.models.len());
        Ok(tags.models)
    }

    /// Embed texts, sending at most `batch_size` per request
    #[inline]
    pub fn generate_embeddings_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint("/api/embed")?;
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1) as usize) {
            let request = BatchEmbedRequest {
                model: &self.embedding_model,
                inputs: batch,
            };
            let json = serde_json::to_string(&request)
                .context("Failed to serialize embedding request")?;
            let body = self
                .with_retry(|| self.post_json(&url, &json))
                .with_context(|| format!("Failed to embed batch of {} texts", batch.len()))?;

            let response: BatchEmbedResponse =
                serde_json::from_str(&body).context("Failed to parse embedding response")?;
            if response.embeddings.len() != batch.len() {
                return Err(anyhow::anyhow!(
                    "Sent {} texts to {} but got {} vectors back",
                    batch.len(),
                    self.embedding_model,
                    response.embeddings.len()
                ));
            }
            vectors.extend(response.embeddings);
        }

        debug!("Embedded {} texts with {}", vectors.len(), self.embedding_model);
        Ok(vectors)
    }

    /// Run one completion. Never retried: a repeated paid call is worse than a reported failure.
    #[inline]
    pub fn generate_completion(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let url = self.endpoint("/api/generate")?;
        let json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.generation_model,
            prompt.len()
        );

        let body = self.post_json(&url, &json).map_err(|e| match e {
            ureq::Error::StatusCode(status) => anyhow::anyhow!("Generation failed: HTTP {}", status),
            other => anyhow::Error::from(other).context("Failed to reach generation service"),
        })?;

        let response: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse generation response")?;
        Ok(response.response)
    }

    fn endpoint(&self, api_path: &str) -> Result<Url> {
        self.base_url
            .join(api_path)
            .with_context(|| format!("Failed to build URL for {}", api_path))
    }

    fn post_json(&self, url: &Url, json: &str) -> Result<String, ureq::Error> {
        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
    }

    fn with_retry<F>(&self, mut call: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut attempt = 1;
        loop {
            let err = match call() {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };

            if !is_transient(&err) {
                warn!("Ollama request to {} failed permanently: {}", self.base_url, err);
                return Err(anyhow::anyhow!("Ollama request failed: {}", err));
            }
            if attempt >= self.retry_attempts {
                error!(
                    "Ollama request to {} failed after {} attempts: {}",
                    self.base_url, attempt, err
                );
                return Err(anyhow::anyhow!("Ollama unavailable: {}", err));
            }

            let delay = Duration::from_millis(EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000);
            warn!(
                "Ollama request failed ({}), retry {}/{} in {:?}",
                err, attempt, self.retry_attempts, delay
            );
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

/// Server errors and transport failures are worth another try; client errors are not
fn is_transient(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::StatusCode(status) => *status >= 500,
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => true,
        _ => false,
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    #[inline]
    async fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.generate_embeddings_batch(texts)
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    #[inline]
    async fn generate(&self, prompt: &str) -> crate::Result<String> {
        self.generate_completion(prompt)
            .map_err(|e| RagError::Generation(format!("{:#}", e)))
    }
}
