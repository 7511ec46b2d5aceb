//! Embedding provider trait and factory.

use super::providers::{OllamaEmbedder, OpenAiEmbedder, TrigramProvider};
use docent_core::config::EmbeddingSettings;
use docent_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations must be deterministic for identical input and must
/// return an empty batch for empty input.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "openai", "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    tracing::debug!(
        "Creating embedding provider: backend={}, model={}, dimensions={}",
        settings.backend,
        settings.model,
        settings.dimension
    );

    match settings.backend.as_str() {
        "openai" => {
            let key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config("OpenAI embeddings require an API key".to_string())
            })?;
            let mut provider = OpenAiEmbedder::new(key, &settings.model, settings.dimension);
            if let Some(endpoint) = &settings.endpoint {
                provider = provider.with_base_url(endpoint);
            }
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let mut provider = OllamaEmbedder::new(&settings.model, settings.dimension)?;
            if let Some(endpoint) = &settings.endpoint {
                provider = provider.with_base_url(endpoint);
            }
            Ok(Arc::new(provider))
        }

        "trigram" => Ok(Arc::new(TrigramProvider::new(settings.dimension))),

        _ => Err(AppError::Config(format!(
            "Unknown embedding backend: '{}'. Supported backends: openai, ollama, trigram",
            settings.backend
        ))),
    }
}
