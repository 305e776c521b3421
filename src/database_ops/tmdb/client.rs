use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{MediaType, RecordKind};

pub const DEFAULT_API_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_LANGUAGE: &str = "en-US";
const ERROR_BODY_LIMIT: usize = 300;

/// Source of raw TMDB records. The fetcher only depends on this seam.
#[async_trait::async_trait]
pub trait TmdbApi: Send + Sync {
    async fn fetch(&self, media: MediaType, kind: RecordKind, id: i64) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct TmdbClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub language: String,
}

impl TmdbClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Bearer-authenticated TMDB v3 client.
#[derive(Clone)]
pub struct TmdbClient {
    http: Client,
    base: Url,
    language: String,
}

impl TmdbClient {
    pub fn new(cfg: TmdbClientConfig) -> Result<Self> {
        anyhow::ensure!(!cfg.api_key.trim().is_empty(), "missing TMDB API key");
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", cfg.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid TMDB API key")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .user_agent("umdb-pipeline/0.1")
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build TMDB HTTP client")?;

        // Url::join drops the last path segment unless the base ends with '/'
        let base = format!("{}/", cfg.base_url.trim_end_matches('/'));
        let base = Url::parse(&base).with_context(|| format!("invalid API base {base}"))?;
        Ok(Self {
            http,
            base,
            language: cfg.language,
        })
    }

    pub fn endpoint_url(&self, media: MediaType, kind: RecordKind, id: i64) -> Result<Url> {
        let mut url = self
            .base
            .join(&kind.endpoint(media, id))
            .context("failed to build endpoint URL")?;
        url.query_pairs_mut().append_pair("language", &self.language);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl TmdbApi for TmdbClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, media: MediaType, kind: RecordKind, id: i64) -> Result<Value> {
        let url = self.endpoint_url(media, kind, id)?;
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url.path()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(anyhow!("GET {} returned {}: {}", url.path(), status, snippet));
        }
        let value: Value = resp
            .json()
            .await
            .with_context(|| format!("GET {} returned invalid JSON", url.path()))?;
        debug!(target = "tmdb", path = url.path(), "fetched record");
        Ok(value)
    }
}
