//! Token, latency and cost accounting.
//!
//! Token counts here are whitespace word counts, an approximation of model
//! tokenization kept for compatibility with existing clients.

use crate::events::Metrics;
use docent_llm::ProviderType;
use std::time::Duration;

/// Price per 1000 tokens, in US dollars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub prompt: f64,
    pub completion: f64,
}

const PRICING: &[(&str, ModelPricing)] = &[
    (
        "gpt-3.5-turbo",
        ModelPricing {
            prompt: 0.0015,
            completion: 0.002,
        },
    ),
    (
        "gpt-4",
        ModelPricing {
            prompt: 0.03,
            completion: 0.06,
        },
    ),
];

/// Chat models clients may request, with display names.
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[("gpt-3.5-turbo", "GPT-3.5 Turbo")];

pub fn pricing(model: &str) -> Option<ModelPricing> {
    PRICING
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, pricing)| *pricing)
}

/// Cost of a call; unknown models cost nothing.
pub fn estimate_cost(model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    pricing(model)
        .map(|p| {
            prompt_tokens as f64 * p.prompt / 1000.0
                + completion_tokens as f64 * p.completion / 1000.0
        })
        .unwrap_or(0.0)
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Models a client may request from `provider`.
///
/// OpenAI requests are limited to the published list plus the configured
/// model. Ollama serves whatever the user pulled locally, so only the
/// configured model is advertised.
pub fn available_models(provider: ProviderType, configured: &str) -> Vec<String> {
    let mut models: Vec<String> = match provider {
        ProviderType::OpenAI => AVAILABLE_MODELS.iter().map(|(id, _)| id.to_string()).collect(),
        ProviderType::Ollama => Vec::new(),
    };
    if !models.iter().any(|m| m == configured) {
        models.push(configured.to_string());
    }
    models
}

/// The model to generate with.
///
/// For OpenAI an unlisted request falls back to the configured model. For
/// Ollama any requested model is passed through.
pub fn resolve_model(requested: Option<&str>, provider: ProviderType, configured: &str) -> String {
    let Some(model) = requested.map(str::trim).filter(|m| !m.is_empty()) else {
        return configured.to_string();
    };

    let allowed = match provider {
        ProviderType::OpenAI => {
            model == configured || AVAILABLE_MODELS.iter().any(|(id, _)| *id == model)
        }
        ProviderType::Ollama => true,
    };

    if allowed {
        model.to_string()
    } else {
        tracing::debug!("Model '{}' not available, using {}", model, configured);
        configured.to_string()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl Metrics {
    /// Build metrics, pricing the tokens for `model`.
    pub fn new(
        model: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
        latency: Option<Duration>,
        is_rag_response: bool,
    ) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            latency: latency.map(|d| round_to(d.as_secs_f64(), 2)),
            estimated_cost: round_to(
                estimate_cost(model, prompt_tokens, completion_tokens),
                6,
            ),
            is_rag_response,
        }
    }
}
