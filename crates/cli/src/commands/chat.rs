//! Chat command handler.
//!
//! Delivers one chat turn through the chat service, printing either plain
//! text as it arrives or the raw server-sent event records.

use clap::Args;
use docent_chat::{
    ChatRequest, ChatService, ChatSettings, RagApiClient, RetrievalBackend, StreamEvent,
};
use docent_core::{config::AppConfig, AppError, AppResult};
use docent_knowledge::RagEngine;
use docent_llm::{create_client, ChatMessage};
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;

/// Chat with streamed answers, optionally grounded on documents
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// The message to send
    pub message: String,

    /// System instruction prepended to the conversation
    #[arg(long)]
    pub system: Option<String>,

    /// Ground the answer on the document collection
    #[arg(long)]
    pub rag: bool,

    /// Wait for the complete answer instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Print server-sent event records instead of plain text
    #[arg(long, conflicts_with = "no_stream")]
    pub sse: bool,

    /// Maximum tokens in response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Temperature for response generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");
        config.validate()?;

        let llm = create_client(
            &config.llm.provider,
            config.llm.endpoint.as_deref(),
            config.llm.api_key.as_deref(),
        )?;

        let mut service = ChatService::new(llm, ChatSettings::from_config(config)?);
        if self.rag {
            if let Some(retrieval) = retrieval_backend(config).await {
                service = service.with_retrieval(retrieval);
            }
        }

        let request = self.request(config);

        if self.no_stream {
            let completion = service.complete_chat(request).await?;
            println!("{}", completion.content);
            tracing::info!("Metrics: {}", serde_json::to_string(&completion.metrics)?);
            return Ok(());
        }

        let mut events = service.stream_chat(request)?;
        let mut stdout = std::io::stdout();

        while let Some(event) = events.next().await {
            let terminal = event.is_terminal();

            if self.sse {
                print!("{}", event.to_sse());
                stdout.flush().ok();
            } else {
                match event {
                    StreamEvent::ContentDelta { text } => {
                        print!("{}", text);
                        stdout.flush().ok();
                    }
                    StreamEvent::Metrics(metrics) => {
                        println!();
                        tracing::info!(
                            "Tokens: {} prompt, {} completion; cost ${:.6}; rag: {}",
                            metrics.prompt_tokens,
                            metrics.completion_tokens,
                            metrics.estimated_cost,
                            metrics.is_rag_response
                        );
                    }
                    StreamEvent::Error { message } => {
                        println!();
                        return Err(AppError::Llm(message));
                    }
                    StreamEvent::Done => {}
                }
            }

            if terminal {
                break;
            }
        }

        Ok(())
    }

    fn request(&self, config: &AppConfig) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(system) = &self.system {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(self.message.clone()));

        let mut request = ChatRequest::new(messages).with_model(config.llm.model.clone());
        request.stream = !self.no_stream;
        request.use_rag = self.rag;
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }
}

/// The configured retrieval service, or the in-process engine.
///
/// Failure to prepare the local index leaves the chat unaugmented.
async fn retrieval_backend(config: &AppConfig) -> Option<Arc<dyn RetrievalBackend>> {
    if let Some(client) = RagApiClient::from_config(config) {
        return Some(Arc::new(client));
    }

    let engine = match RagEngine::from_config(config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::warn!("Retrieval disabled: {}", e);
            return None;
        }
    };

    match engine.ensure_index().await {
        Ok(count) => {
            tracing::debug!("Local index ready with {} chunks", count);
            Some(Arc::new(engine))
        }
        Err(e) => {
            tracing::warn!("Retrieval disabled: {}", e);
            None
        }
    }
}
