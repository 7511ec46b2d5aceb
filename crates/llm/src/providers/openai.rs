//! OpenAI-compatible chat completions provider.
//!
//! Works against api.openai.com and any server speaking the same
//! `/chat/completions` protocol, including its `data: ...` event stream.

use crate::client::{
    ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage,
};
use docent_core::{AppError, AppResult};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    model: String,
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// OpenAI-compatible LLM client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for api.openai.com.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Create a client for a custom OpenAI-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_body<'a>(&self, request: &'a LlmRequest, stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            stream,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    async fn post(&self, body: &ChatCompletionRequest<'_>) -> AppResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);

            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, message
            )));
        }

        Ok(response)
    }
}

/// Parse the data of one server-sent event. `Ok(None)` means the event
/// carried nothing to emit.
fn parse_event_data(data: &str, model: &str) -> AppResult<Option<LlmStreamChunk>> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    if data == "[DONE]" {
        return Ok(Some(LlmStreamChunk {
            content: String::new(),
            model: model.to_string(),
            done: true,
            usage: None,
        }));
    }

    let event: StreamResponse = serde_json::from_str(data)
        .map_err(|e| AppError::Llm(format!("Failed to parse stream event: {}", e)))?;

    let Some(choice) = event.choices.into_iter().next() else {
        return Ok(None);
    };

    let content = choice.delta.content.unwrap_or_default();
    if content.is_empty() && choice.finish_reason.is_none() {
        return Ok(None);
    }

    Ok(Some(LlmStreamChunk {
        content,
        model: if event.model.is_empty() {
            model.to_string()
        } else {
            event.model
        },
        done: false,
        usage: None,
    }))
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to OpenAI");
        tracing::debug!(model = %request.model, messages = request.messages.len(), "completion request");

        let response = self.post(&self.to_body(request, false)).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Llm("No choices in OpenAI response".to_string()))?;

        let usage = body
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: if body.model.is_empty() {
                request.model.clone()
            } else {
                body.model
            },
            usage,
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to OpenAI");

        let response = self.post(&self.to_body(request, true)).await?;
        let model = request.model.clone();

        let stream = response.bytes_stream().eventsource().filter_map(move |event| {
            let item = match event {
                Ok(event) => parse_event_data(&event.data, &model).transpose(),
                Err(e) => Some(Err(AppError::Llm(format!("Stream error: {}", e)))),
            };
            futures::future::ready(item)
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_server::serve_in_pieces;

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::with_base_url("http://localhost:8080/v1/", "sk-test");
        assert_eq!(client.provider_name(), "openai");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_body_serialization() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::from_prompt("Hi", "gpt-3.5-turbo").with_temperature(0.7);
        let body = serde_json::to_value(client.to_body(&request, true)).unwrap();

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_content_delta() {
        let chunk = parse_event_data(
            r#"{"model":"gpt-3.5-turbo","choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#,
            "gpt-3.5-turbo",
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.content, "Hel");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_role_only_delta_is_skipped() {
        let parsed = parse_event_data(
            r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#,
            "gpt-3.5-turbo",
        )
        .unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_parse_done_sentinel() {
        let chunk = parse_event_data("[DONE]", "gpt-4").unwrap().unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.model, "gpt-4");
    }

    #[test]
    fn test_empty_event_data_is_ignored() {
        assert!(parse_event_data("", "gpt-4").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stream_keeps_character_split_across_reads() {
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"},\"finish_reason\":null}]}\n\n"
            .as_bytes();
        let split = event.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let base_url = serve_in_pieces(
            "text/event-stream",
            vec![
                event[..split].to_vec(),
                event[split..].to_vec(),
                b"data: [DONE]\n\n".to_vec(),
            ],
        )
        .await;

        let client = OpenAiClient::with_base_url(base_url, "sk-test");
        let request = LlmRequest::from_prompt("Hi", "gpt-3.5-turbo");
        let chunks: Vec<LlmStreamChunk> = client
            .stream(&request)
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(text, "café");
        assert!(chunks.last().unwrap().done);
    }
}
