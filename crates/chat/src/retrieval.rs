//! Retrieval collaborators used by the chat service.
//!
//! Augmented answers come either from an in-process [`RagEngine`] or from a
//! remote retrieval service reached over HTTP. Both are seen through
//! [`RetrievalBackend`], and every failure is reported as
//! `AppError::RetrievalUnavailable` so the caller can fall back.

use docent_core::{AppConfig, AppError, AppResult};
use docent_knowledge::rag::{HealthResponse, IndexResponse, QueryRequest, QueryResponse};
use docent_knowledge::{RagAnswer, RagEngine};
use std::time::Duration;

/// Something that answers a query from indexed documents.
#[async_trait::async_trait]
pub trait RetrievalBackend: Send + Sync {
    /// Backend name for logs (e.g., "local", "http").
    fn name(&self) -> &str;

    /// Answer `query` grounded on the `top_k` best chunks.
    async fn query(&self, query: &str, top_k: usize) -> AppResult<RagAnswer>;
}

#[async_trait::async_trait]
impl RetrievalBackend for RagEngine {
    fn name(&self) -> &str {
        "local"
    }

    async fn query(&self, query: &str, top_k: usize) -> AppResult<RagAnswer> {
        self.answer_question(query, top_k)
            .await
            .map_err(|e| AppError::RetrievalUnavailable(e.to_string()))
    }
}

/// HTTP client for a remote retrieval service.
///
/// Base URL example: `http://localhost:5003/api/rag`.
pub struct RagApiClient {
    base_url: String,
    client: reqwest::Client,
    query_timeout: Duration,
    health_timeout: Duration,
    index_timeout: Duration,
}

impl RagApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            query_timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(5),
            index_timeout: Duration::from_secs(30),
        }
    }

    /// Client for the configured service, if one is configured.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let rag = &config.rag;
        rag.api_url.as_deref().map(|url| {
            Self::new(url).with_timeouts(
                Duration::from_secs(rag.query_timeout_secs),
                Duration::from_secs(rag.health_timeout_secs),
                Duration::from_secs(rag.index_timeout_secs),
            )
        })
    }

    pub fn with_timeouts(mut self, query: Duration, health: Duration, index: Duration) -> Self {
        self.query_timeout = query;
        self.health_timeout = health;
        self.index_timeout = index;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `GET /health`. Healthy only when the service reports `ok`.
    pub async fn health(&self) -> AppResult<HealthResponse> {
        let response = self
            .client
            .get(self.url("health"))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(unavailable)?;

        let health: HealthResponse = read_json(response).await?;
        if !health.is_healthy() {
            return Err(AppError::RetrievalUnavailable(format!(
                "Retrieval service unhealthy: {}",
                health.message
            )));
        }

        Ok(health)
    }

    /// `POST /index`. Asks the service to rebuild its index.
    pub async fn trigger_index(&self) -> AppResult<IndexResponse> {
        tracing::info!("Triggering remote re-index at {}", self.base_url);

        let response = self
            .client
            .post(self.url("index"))
            .timeout(self.index_timeout)
            .send()
            .await
            .map_err(unavailable)?;

        let index: IndexResponse = read_json(response).await?;
        if index.status != "success" {
            return Err(AppError::RetrievalUnavailable(format!(
                "Re-index failed: {}",
                index.message
            )));
        }

        Ok(index)
    }
}

#[async_trait::async_trait]
impl RetrievalBackend for RagApiClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn query(&self, query: &str, top_k: usize) -> AppResult<RagAnswer> {
        tracing::debug!("Querying retrieval service at {}", self.base_url);

        let response = self
            .client
            .post(self.url("query"))
            .json(&QueryRequest::new(query, top_k))
            .timeout(self.query_timeout)
            .send()
            .await
            .map_err(unavailable)?;

        let body: QueryResponse = read_json(response).await?;
        if !body.is_success() {
            return Err(AppError::RetrievalUnavailable(
                body.message
                    .unwrap_or_else(|| format!("Retrieval status '{}'", body.status)),
            ));
        }

        Ok(body.into())
    }
}

fn unavailable(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::RetrievalUnavailable("Retrieval service timed out".to_string())
    } else {
        AppError::RetrievalUnavailable(format!("Retrieval service unreachable: {}", err))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(AppError::RetrievalUnavailable(format!(
            "Retrieval service error ({}): {}",
            status, text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::RetrievalUnavailable(format!("Invalid retrieval response: {}", e)))
}
