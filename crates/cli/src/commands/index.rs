//! Index command handler.

use super::print_json;
use clap::Args;
use docent_chat::RagApiClient;
use docent_core::{config::AppConfig, AppResult};
use docent_knowledge::RagEngine;

/// Re-index the document collection
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Ask the configured retrieval service to re-index instead
    #[arg(long)]
    pub remote: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        if self.remote {
            return self.execute_remote(config).await;
        }

        config.validate()?;
        let engine = RagEngine::from_config(config)?;

        tracing::info!("Re-indexing {:?}", config.data_dir());
        let count = engine.reindex().await?;

        if self.json {
            print_json(&serde_json::json!({
                "status": "success",
                "chunks": count,
                "dataDir": config.data_dir(),
            }))
        } else {
            println!("Indexed {} chunks from {}", count, config.data_dir().display());
            Ok(())
        }
    }

    async fn execute_remote(&self, config: &AppConfig) -> AppResult<()> {
        let client = RagApiClient::from_config(config).ok_or_else(|| {
            docent_core::AppError::Config(
                "No retrieval service configured: set rag.apiUrl or DOCENT_RAG_API_URL".to_string(),
            )
        })?;

        let response = client.trigger_index().await?;

        if self.json {
            print_json(&serde_json::json!({
                "status": response.status,
                "message": response.message,
            }))
        } else {
            println!("{}", response.message);
            Ok(())
        }
    }
}
