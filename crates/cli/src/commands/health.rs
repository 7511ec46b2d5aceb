//! Health command handler.

use super::print_json;
use clap::Args;
use docent_chat::RagApiClient;
use docent_core::{config::AppConfig, AppResult};
use docent_knowledge::IndexPaths;

/// Check the retrieval service
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let Some(client) = RagApiClient::from_config(config) else {
            return self.local_status(config);
        };

        let health = client.health().await?;

        if self.json {
            print_json(&serde_json::json!({
                "status": health.status,
                "message": health.message,
                "url": client.base_url(),
            }))
        } else {
            println!("{}: {} {}", client.base_url(), health.status, health.message);
            Ok(())
        }
    }

    /// Without a retrieval service, report whether a persisted index exists.
    fn local_status(&self, config: &AppConfig) -> AppResult<()> {
        let paths = IndexPaths::new(&config.data_dir(), &config.rag.index_name);
        let indexed = paths.exists();

        if self.json {
            print_json(&serde_json::json!({
                "status": if indexed { "ok" } else { "missing" },
                "index": paths.vectors,
            }))
        } else if indexed {
            println!("Local index present at {}", paths.vectors.display());
            Ok(())
        } else {
            println!("No local index; run `docent index`");
            Ok(())
        }
    }
}
