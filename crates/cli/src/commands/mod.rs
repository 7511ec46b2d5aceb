//! Command handlers for the Docent CLI.

pub mod ask;
pub mod chat;
pub mod health;
pub mod index;
pub mod models;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use health::HealthCommand;
pub use index::IndexCommand;
pub use models::ModelsCommand;

use docent_core::{AppError, AppResult};

/// Pretty JSON on stdout.
pub(crate) fn print_json(value: &serde_json::Value) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
