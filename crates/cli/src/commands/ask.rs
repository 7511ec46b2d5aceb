//! Ask command handler.
//!
//! Answers one question from the document collection, either with the
//! in-process engine or through the configured retrieval service.

use super::print_json;
use clap::Args;
use docent_chat::{RagApiClient, RetrievalBackend};
use docent_core::{config::AppConfig, AppError, AppResult};
use docent_knowledge::{RagAnswer, RagEngine};

/// Answer a question from the document collection
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        if self.question.trim().is_empty() {
            return Err(AppError::InvalidRequest("Query must not be empty".to_string()));
        }

        let top_k = self.top_k.unwrap_or(config.rag.top_k);

        let answer = match RagApiClient::from_config(config) {
            Some(client) => {
                tracing::debug!("Using retrieval service at {}", client.base_url());
                client.query(&self.question, top_k).await?
            }
            None => {
                config.validate()?;
                let engine = RagEngine::from_config(config)?;
                let count = engine.ensure_index().await?;
                tracing::debug!("Index ready with {} chunks", count);
                engine.answer_question(&self.question, top_k).await?
            }
        };

        self.print(&answer)
    }

    fn print(&self, answer: &RagAnswer) -> AppResult<()> {
        if self.json {
            let value = serde_json::to_value(answer)?;
            return print_json(&value);
        }

        println!("{}", answer.answer);

        if !answer.sources.is_empty() {
            println!();
            println!("Sources:");
            for (i, source) in answer.sources.iter().enumerate() {
                match source.page {
                    Some(page) => println!(
                        "  [{}] {}, Page {} (score {:.2})",
                        i + 1,
                        source.source,
                        page,
                        source.score
                    ),
                    None => println!("  [{}] {} (score {:.2})", i + 1, source.source, source.score),
                }
            }
        }

        Ok(())
    }
}
