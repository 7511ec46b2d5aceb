//! Stream events and their server-sent wire encoding.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::pin::Pin;

/// Terminal record of a successful stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Usage and cost summary of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,

    /// Seconds since the request began, rounded to 2 decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,

    /// US dollars, rounded to 6 decimals
    pub estimated_cost: f64,

    pub is_rag_response: bool,
}

/// One record of an answer stream.
///
/// A stream is any number of `ContentDelta`s followed by either
/// `Metrics` + `Done`, or a single `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ContentDelta { text: String },
    Metrics(Metrics),
    Error { message: String },
    Done,
}

impl StreamEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        Self::ContentDelta { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }

    /// JSON payload of the `data:` line.
    pub fn payload(&self) -> String {
        match self {
            Self::ContentDelta { text } => {
                json!({ "choices": [{ "delta": { "content": text } }] }).to_string()
            }
            Self::Metrics(metrics) => json!({ "metrics": metrics }).to_string(),
            Self::Error { message } => json!({ "error": message }).to_string(),
            Self::Done => DONE_SENTINEL.to_string(),
        }
    }

    /// Encode as one server-sent event record.
    pub fn to_sse(&self) -> String {
        format!("data: {}\n\n", self.payload())
    }
}

/// Ordered answer events for one consumer.
pub type EventStream = Pin<Box<dyn futures::Stream<Item = StreamEvent> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics(latency: Option<f64>) -> Metrics {
        Metrics {
            prompt_tokens: 3,
            completion_tokens: 5,
            total_tokens: 8,
            latency,
            estimated_cost: 0.0000145,
            is_rag_response: true,
        }
    }

    #[test]
    fn test_delta_record() {
        assert_eq!(
            StreamEvent::delta("Hel").to_sse(),
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n"
        );
    }

    #[test]
    fn test_metrics_record_uses_camel_case() {
        let payload = StreamEvent::Metrics(sample_metrics(Some(0.42))).payload();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();

        let metrics = &value["metrics"];
        assert_eq!(metrics["promptTokens"], 3);
        assert_eq!(metrics["completionTokens"], 5);
        assert_eq!(metrics["totalTokens"], 8);
        assert_eq!(metrics["latency"], 0.42);
        assert_eq!(metrics["isRagResponse"], true);
    }

    #[test]
    fn test_metrics_without_latency_omits_key() {
        let value = serde_json::to_value(sample_metrics(None)).unwrap();
        assert!(value.get("latency").is_none());
        assert!(value.get("estimatedCost").is_some());
    }

    #[test]
    fn test_error_and_done_records() {
        assert_eq!(
            StreamEvent::error("boom").to_sse(),
            "data: {\"error\":\"boom\"}\n\n"
        );
        assert_eq!(StreamEvent::Done.to_sse(), "data: [DONE]\n\n");
        assert!(StreamEvent::Done.is_terminal());
        assert!(!StreamEvent::delta("x").is_terminal());
    }
}
