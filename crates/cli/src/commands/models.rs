//! Models command handler.

use super::print_json;
use clap::Args;
use docent_chat::{available_models, AVAILABLE_MODELS};
use docent_core::{config::AppConfig, AppError, AppResult};
use docent_llm::ProviderType;

/// List the chat models clients may request
#[derive(Args, Debug)]
pub struct ModelsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ModelsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let provider = ProviderType::parse(&config.llm.provider).ok_or_else(|| {
            AppError::Config(format!("Unsupported LLM provider: {}", config.llm.provider))
        })?;
        let models = available_models(provider, &config.llm.model);

        if self.json {
            return print_json(&serde_json::json!({
                "provider": provider.as_str(),
                "models": models,
            }));
        }

        for id in &models {
            let name = AVAILABLE_MODELS
                .iter()
                .find(|(known, _)| *known == id.as_str())
                .map(|(_, name)| *name)
                .unwrap_or("configured");
            println!("{:<20} {}", id, name);
        }
        Ok(())
    }
}
