//! Title embeddings: text assembly, the embedding service client, and the
//! pgvector text form stored in `titles.csv`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::database_ops::tables::TitleRow;

/// Column width of `titles.embedding`.
pub const EMBEDDING_DIM: usize = 256;
pub const DEFAULT_MODEL: &str = "sentence-transformers/static-similarity-mrl-multilingual-v1";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";
pub const DEFAULT_BATCH_SIZE: usize = 64;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Vector width the embedder is asked to produce.
    fn dimensions(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout: Duration,
    pub max_retries: usize,
    /// First retry waits twice this; each further retry doubles, capped at 32x.
    pub retry_base: Duration,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            dimensions: EMBEDDING_DIM,
            timeout: Duration::from_secs(60),
            max_retries: 5,
            retry_base: Duration::from_millis(500),
        }
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    max_retries: usize,
    retry_base: Duration,
}

impl HttpEmbedder {
    pub fn new(cfg: HttpEmbedderConfig) -> Result<Self> {
        anyhow::ensure!(!cfg.model.trim().is_empty(), "missing embedding model name");
        let mut headers = HeaderMap::new();
        if let Some(key) = cfg.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}"))
                    .context("invalid embedding API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embedding HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", cfg.base_url.trim_end_matches('/')),
            model: cfg.model,
            dimensions: cfg.dimensions,
            max_retries: cfg.max_retries.max(1),
            retry_base: cfg.retry_base,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn is_retryable_error(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_request()
    }

    fn retry_backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.retry_base * (1 << capped)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: Some(self.dimensions),
        };

        let mut attempt = 0usize;
        loop {
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp
                            .json()
                            .await
                            .context("failed to parse embedding response")?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        anyhow::ensure!(
                            parsed.data.len() == inputs.len(),
                            "embedding service returned {} vectors for {} inputs",
                            parsed.data.len(),
                            inputs.len()
                        );
                        return Ok(parsed.data.into_iter().map(|e| e.embedding).collect());
                    }
                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if Self::should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(target = "embedding", %status, attempt, "retrying embedding request");
                        tokio::time::sleep(self.retry_backoff(attempt)).await;
                        continue;
                    }
                    anyhow::bail!("embedding request failed ({status}): {body}");
                }
                Err(err) => {
                    if Self::is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(target = "embedding", error = %err, attempt, "retrying embedding request");
                        tokio::time::sleep(self.retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err).context("embedding request failed");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Text embedded for a title: `title + " " + overview`.
pub fn title_text(row: &TitleRow) -> String {
    format!("{} {}", row.title, row.overview.as_deref().unwrap_or(""))
}

/// Renders a vector in pgvector text form with 8 decimal places.
pub fn format_embedding(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.8}")).collect();
    format!("[{}]", parts.join(","))
}

/// Parses the text form back, requiring exactly `dim` components.
pub fn parse_embedding(raw: &str, dim: usize) -> Result<Vec<f32>> {
    let inner = raw
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .with_context(|| format!("embedding is not bracketed: {raw:.40}"))?;
    let values = inner
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<f32>().with_context(|| format!("bad component {s:?}")))
        .collect::<Result<Vec<f32>>>()?;
    anyhow::ensure!(
        values.len() == dim,
        "expected {dim} embedding components, got {}",
        values.len()
    );
    Ok(values)
}

/// Fills `embedding` on every title, batching requests through `embedder`.
///
/// Longer vectors are cut to `dim`; shorter ones fail the run.
pub async fn embed_titles<E: Embedder + ?Sized>(
    embedder: &E,
    titles: &mut [TitleRow],
    batch_size: usize,
    dim: usize,
) -> Result<()> {
    let batch_size = batch_size.max(1);
    let total = titles.len();
    let mut done = 0usize;
    for chunk in titles.chunks_mut(batch_size) {
        let texts: Vec<String> = chunk.iter().map(title_text).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .with_context(|| format!("embedding batch starting at title {}", chunk[0].id))?;
        anyhow::ensure!(
            vectors.len() == chunk.len(),
            "embedder returned {} vectors for {} titles",
            vectors.len(),
            chunk.len()
        );
        for (row, mut vector) in chunk.iter_mut().zip(vectors) {
            anyhow::ensure!(
                vector.len() >= dim,
                "embedding for title {} has {} dimensions, need {dim}",
                row.id,
                vector.len()
            );
            vector.truncate(dim);
            row.embedding = Some(format_embedding(&vector));
        }
        done += chunk.len();
        debug!(target = "embedding", done, total, "embedded batch");
    }
    info!(target = "embedding", total, dim, "embedded titles");
    Ok(())
}
