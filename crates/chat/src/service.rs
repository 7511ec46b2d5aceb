//! Answer delivery over a conversation.
//!
//! A request either takes the augmented path (retrieval, then a complete
//! grounded answer re-delivered in small increments) or the plain path
//! (the conversation forwarded to the generator's own stream). Retrieval
//! failure of any kind degrades to the plain path without telling the
//! caller.

use crate::events::{EventStream, Metrics, StreamEvent};
use crate::metrics::{resolve_model, word_count};
use crate::retrieval::RetrievalBackend;
use docent_core::{AppConfig, AppError, AppResult};
use docent_knowledge::{RagAnswer, SourceRef};
use docent_core::config::DEFAULT_CHAT_MODEL;
use docent_llm::{ChatMessage, ChatRole, LlmClient, LlmRequest, ProviderType};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn default_true() -> bool {
    true
}

/// A chat request as sent by clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Requested model; see [`resolve_model`] for how it is honoured
    #[serde(default)]
    pub model: Option<String>,

    /// Whether the caller wants incremental delivery
    #[serde(default = "default_true")]
    pub stream: bool,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Ground the answer on the document collection
    #[serde(default, alias = "useRag")]
    pub use_rag: bool,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            stream: true,
            ..Self::default()
        }
    }

    pub fn with_rag(mut self) -> Self {
        self.use_rag = true;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The query for retrieval: content of the last message, if a user wrote it.
    fn rag_query(&self) -> Option<&str> {
        if !self.use_rag {
            return None;
        }
        self.messages
            .last()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }

    /// Reject empty or degenerate input before any network call.
    fn validate(&self) -> AppResult<()> {
        if self.messages.is_empty() {
            return Err(AppError::InvalidRequest("No messages provided".to_string()));
        }

        if let Some(query) = self.rag_query() {
            if query.trim().is_empty() {
                return Err(AppError::InvalidRequest("Query must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Delivery tuning.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Provider behind the generator, which decides what models are allowed
    pub provider: ProviderType,

    /// Configured generation model, used when a request names none
    pub model: String,

    /// Chunks retrieved for augmented answers
    pub top_k: usize,

    /// Bound on the whole retrieval call
    pub retrieval_timeout: Duration,

    /// Characters per increment when re-delivering a complete answer
    pub increment_chars: usize,

    /// Pause between those increments
    pub pacing: Duration,

    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider: ProviderType::OpenAI,
            model: DEFAULT_CHAT_MODEL.to_string(),
            top_k: 3,
            retrieval_timeout: Duration::from_secs(10),
            increment_chars: 12,
            pacing: Duration::from_millis(20),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let provider = ProviderType::parse(&config.llm.provider).ok_or_else(|| {
            AppError::Config(format!("Unsupported LLM provider: {}", config.llm.provider))
        })?;

        Ok(Self {
            provider,
            model: config.llm.model.clone(),
            top_k: config.rag.top_k,
            retrieval_timeout: Duration::from_secs(config.rag.query_timeout_secs),
            increment_chars: config.delivery.increment_chars.max(1),
            pacing: Duration::from_millis(config.delivery.pacing_ms),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        })
    }

    fn resolve_model(&self, requested: Option<&str>) -> String {
        resolve_model(requested, self.provider, &self.model)
    }
}

/// A complete, non-streamed answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub metrics: Metrics,
}

impl ChatCompletion {
    /// Response body in the chat completions shape.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "choices": [{ "message": { "content": self.content } }],
            "metrics": self.metrics,
        })
    }
}

/// Render cited sources as a block appended to an augmented answer.
///
/// Empty when there are no sources.
pub fn render_sources(sources: &[SourceRef]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let lines: Vec<String> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| match s.page {
            Some(page) => format!("[{}] {}, Page {}", i + 1, s.source, page),
            None => format!("[{}] {}", i + 1, s.source),
        })
        .collect();

    format!("\n\nSources:\n{}", lines.join("\n"))
}

/// Split `text` into pieces of at most `size` characters.
pub fn increments(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Delivers answers for chat requests.
pub struct ChatService {
    llm: Arc<dyn LlmClient>,
    retrieval: Option<Arc<dyn RetrievalBackend>>,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(llm: Arc<dyn LlmClient>, settings: ChatSettings) -> Self {
        Self {
            llm,
            retrieval: None,
            settings,
        }
    }

    /// Enable the augmented path.
    pub fn with_retrieval(mut self, retrieval: Arc<dyn RetrievalBackend>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Ask the retrieval backend, bounded by the configured timeout.
    ///
    /// `None` means fall back to plain generation.
    async fn try_retrieve(&self, query: &str) -> Option<RagAnswer> {
        let retrieval = self.retrieval.as_ref()?;
        retrieve_bounded(
            retrieval.as_ref(),
            query,
            self.settings.top_k,
            self.settings.retrieval_timeout,
        )
        .await
    }

    fn plain_request(&self, request: &ChatRequest, model: &str) -> LlmRequest {
        LlmRequest::new(request.messages.clone(), model)
            .with_temperature(request.temperature.unwrap_or(self.settings.temperature))
            .with_max_tokens(request.max_tokens.unwrap_or(self.settings.max_tokens))
    }

    /// Stream the answer to `request` as ordered events.
    ///
    /// Validation happens before this returns; everything else, including
    /// generation failures, is reported inside the stream. Dropping the
    /// stream stops production.
    pub fn stream_chat(&self, request: ChatRequest) -> AppResult<EventStream> {
        request.validate()?;

        let model = self.settings.resolve_model(request.model.as_deref());
        let query = request.rag_query().map(str::to_string);
        let llm_request = self.plain_request(&request, &model).with_streaming();

        let llm = Arc::clone(&self.llm);
        let retrieval = self.retrieval.clone();
        let settings = self.settings.clone();

        let stream = async_stream::stream! {
            let started = Instant::now();

            let answer = match (query.as_deref(), retrieval.as_ref()) {
                (Some(query), Some(retrieval)) => retrieve_bounded(
                    retrieval.as_ref(),
                    query,
                    settings.top_k,
                    settings.retrieval_timeout,
                )
                .await
                .map(|answer| (query.to_string(), answer)),
                _ => None,
            };

            if let Some((query, answer)) = answer {
                let full = format!("{}{}", answer.answer, render_sources(&answer.sources));
                let pieces = increments(&full, settings.increment_chars);
                let last = pieces.len().saturating_sub(1);

                for (i, piece) in pieces.into_iter().enumerate() {
                    yield StreamEvent::delta(piece);
                    if i < last && !settings.pacing.is_zero() {
                        tokio::time::sleep(settings.pacing).await;
                    }
                }

                yield StreamEvent::Metrics(Metrics::new(
                    &model,
                    word_count(&query),
                    word_count(&full),
                    Some(started.elapsed()),
                    true,
                ));
                yield StreamEvent::Done;
                return;
            }

            let mut chunks = match llm.stream(&llm_request).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    tracing::error!("Generation failed to start: {}", e);
                    yield StreamEvent::error(e.to_string());
                    return;
                }
            };

            let mut completion_tokens = 0;
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(chunk) => {
                        if !chunk.content.is_empty() {
                            completion_tokens += word_count(&chunk.content);
                            yield StreamEvent::delta(chunk.content);
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Generation failed mid-stream: {}", e);
                        yield StreamEvent::error(e.to_string());
                        return;
                    }
                }
            }

            yield StreamEvent::Metrics(Metrics::new(
                &model,
                0,
                completion_tokens,
                Some(started.elapsed()),
                false,
            ));
            yield StreamEvent::Done;
        };

        Ok(Box::pin(stream))
    }

    /// Answer `request` in one piece.
    ///
    /// Augmented answers carry no latency; plain answers use the usage the
    /// generator reports. Generation errors propagate.
    pub async fn complete_chat(&self, request: ChatRequest) -> AppResult<ChatCompletion> {
        request.validate()?;

        let model = self.settings.resolve_model(request.model.as_deref());

        if let Some(query) = request.rag_query() {
            if let Some(answer) = self.try_retrieve(query).await {
                let content = format!("{}{}", answer.answer, render_sources(&answer.sources));
                let metrics = Metrics::new(
                    &model,
                    word_count(query),
                    word_count(&content),
                    None,
                    true,
                );
                return Ok(ChatCompletion { content, metrics });
            }
        }

        let started = Instant::now();
        let response = self.llm.complete(&self.plain_request(&request, &model)).await?;

        let metrics = Metrics::new(
            &model,
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            Some(started.elapsed()),
            false,
        );

        Ok(ChatCompletion {
            content: response.content,
            metrics,
        })
    }
}

async fn retrieve_bounded(
    retrieval: &dyn RetrievalBackend,
    query: &str,
    top_k: usize,
    limit: Duration,
) -> Option<RagAnswer> {
    match tokio::time::timeout(limit, retrieval.query(query, top_k)).await {
        Ok(Ok(answer)) => {
            tracing::debug!(
                "Retrieval via {} returned {} sources",
                retrieval.name(),
                answer.sources.len()
            );
            Some(answer)
        }
        Ok(Err(e)) => {
            tracing::warn!("Retrieval via {} failed, answering without context: {}", retrieval.name(), e);
            None
        }
        Err(_) => {
            tracing::warn!(
                "Retrieval via {} timed out after {:?}, answering without context",
                retrieval.name(),
                limit
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, page: Option<u32>) -> SourceRef {
        SourceRef {
            source: name.to_string(),
            page,
            score: 0.5,
        }
    }

    #[test]
    fn test_render_sources() {
        assert_eq!(render_sources(&[]), "");
        assert_eq!(
            render_sources(&[source("doc.txt", Some(2)), source("notes.md", None)]),
            "\n\nSources:\n[1] doc.txt, Page 2\n[2] notes.md"
        );
    }

    #[test]
    fn test_increments_split_on_chars() {
        assert_eq!(increments("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(increments("héllo", 2), vec!["hé", "ll", "o"]);
        assert!(increments("", 12).is_empty());
    }

    #[test]
    fn test_request_defaults() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}],"useRag":true}"#)
                .unwrap();
        assert!(request.stream);
        assert!(request.use_rag);
        assert_eq!(request.rag_query(), Some("hi"));
        assert!(request.model.is_none());
    }

    #[test]
    fn test_rag_query_requires_trailing_user_turn() {
        let request = ChatRequest::new(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ])
        .with_rag();
        assert_eq!(request.rag_query(), None);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            ChatRequest::new(Vec::new()).validate(),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            ChatRequest::new(vec![ChatMessage::user("  ")]).with_rag().validate(),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(ChatRequest::new(vec![ChatMessage::user("  ")]).validate().is_ok());
    }

    #[test]
    fn test_settings_follow_configured_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".to_string();
        config.llm.model = "llama3.2".to_string();

        let settings = ChatSettings::from_config(&config).unwrap();
        assert_eq!(settings.provider, ProviderType::Ollama);
        assert_eq!(settings.resolve_model(None), "llama3.2");
        assert_eq!(settings.resolve_model(Some("llama3.2")), "llama3.2");

        config.llm.provider = "claude".to_string();
        assert!(matches!(
            ChatSettings::from_config(&config),
            Err(AppError::Config(_))
        ));
    }
}
