//! Wire types of the retrieval service.
//!
//! `GET /health`, `POST /index` and `POST /query` exchange these bodies.
//! Failures come back as `{"status": "error", "message": ...}`.

use super::types::{RagAnswer, SourceRef};
use serde::{Deserialize, Serialize};

fn default_top_k() -> usize {
    3
}

/// Body of `POST /query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
        }
    }
}

/// Response of `POST /query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: String,

    #[serde(default)]
    pub answer: String,

    #[serde(default)]
    pub sources: Vec<SourceRef>,

    #[serde(default)]
    pub has_context: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QueryResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

impl From<RagAnswer> for QueryResponse {
    fn from(answer: RagAnswer) -> Self {
        Self {
            status: "success".to_string(),
            answer: answer.answer,
            sources: answer.sources,
            has_context: answer.has_context,
            message: None,
        }
    }
}

impl From<QueryResponse> for RagAnswer {
    fn from(response: QueryResponse) -> Self {
        Self {
            answer: response.answer,
            sources: response.sources,
            has_context: response.has_context,
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,

    #[serde(default)]
    pub message: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
    }
}

/// Response of `POST /index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub status: String,

    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_default_top_k() {
        let request: QueryRequest = serde_json::from_str(r#"{"query":"capital?"}"#).unwrap();
        assert_eq!(request.top_k, 3);
    }

    #[test]
    fn test_query_response_parses_service_body() {
        let body = r#"{
            "status": "success",
            "answer": "Paris.",
            "sources": [{"source": "doc.txt", "page": null, "score": 0.9}],
            "has_context": true
        }"#;

        let response: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(response.is_success());

        let answer = RagAnswer::from(response);
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].source, "doc.txt");
        assert!(answer.has_context);
    }

    #[test]
    fn test_answer_to_response() {
        let response = QueryResponse::from(RagAnswer::no_context());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["has_context"], false);
        assert_eq!(json["sources"], serde_json::json!([]));
    }

    #[test]
    fn test_health_status() {
        let ok: HealthResponse =
            serde_json::from_str(r#"{"status":"ok","message":"RAG API is running"}"#).unwrap();
        assert!(ok.is_healthy());
        assert_eq!(ok.message, "RAG API is running");

        let down: HealthResponse = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert!(!down.is_healthy());
    }

    #[test]
    fn test_error_body_parses() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"status":"error","message":"Missing required parameter: query"}"#)
                .unwrap();
        assert!(!response.is_success());
        assert_eq!(
            response.message.as_deref(),
            Some("Missing required parameter: query")
        );
    }
}
