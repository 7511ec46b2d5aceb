//! Configuration management for Docent.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.docent/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. The configuration is workspace-centric, with state stored
//! in `.docent/` and documents plus the persisted index in the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Chat model used when a request names an unknown one.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];
const KNOWN_EMBEDDING_BACKENDS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docent/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Generation capability settings
    pub llm: LlmSettings,

    /// Embedding backend settings
    pub embedding: EmbeddingSettings,

    /// Retrieval pipeline settings
    pub rag: RagSettings,

    /// Streaming delivery settings
    pub delivery: DeliverySettings,
}

/// Settings for the generation capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider name ("openai" or "ollama")
    pub provider: String,

    /// Default chat model
    pub model: String,

    /// Optional custom endpoint
    pub endpoint: Option<String>,

    /// API key (never written back to disk)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum completion tokens
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            endpoint: None,
            api_key: None,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// Settings for the embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Backend name ("openai", "ollama" or "trigram")
    pub backend: String,

    /// Embedding model identifier
    pub model: String,

    /// Vector dimension produced by the backend
    pub dimension: usize,

    /// Optional custom endpoint
    pub endpoint: Option<String>,
}

impl EmbeddingSettings {
    /// Remote API-backed embeddings (OpenAI ada-002).
    pub fn remote() -> Self {
        Self {
            backend: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimension: 1536,
            endpoint: None,
        }
    }

    /// Local model-backed embeddings (all-MiniLM-L6-v2 served by Ollama).
    pub fn local() -> Self {
        Self {
            backend: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimension: 384,
            endpoint: None,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self::local()
    }
}

/// Settings for chunking, indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Directory holding source documents and the persisted index
    #[serde(rename = "dataDir")]
    pub data_dir: PathBuf,

    /// Base name of the persisted index artifacts
    #[serde(rename = "indexName")]
    pub index_name: String,

    /// Target chunk size in characters
    #[serde(rename = "chunkSize")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(rename = "chunkOverlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per query
    #[serde(rename = "topK")]
    pub top_k: usize,

    /// File extensions picked up when scanning the data directory
    pub extensions: Vec<String>,

    /// Base URL of a remote retrieval service; in-process when unset
    #[serde(rename = "apiUrl")]
    pub api_url: Option<String>,

    /// Timeout for retrieval queries
    #[serde(rename = "queryTimeoutSecs")]
    pub query_timeout_secs: u64,

    /// Timeout for health checks
    #[serde(rename = "healthTimeoutSecs")]
    pub health_timeout_secs: u64,

    /// Timeout for index triggers
    #[serde(rename = "indexTimeoutSecs")]
    pub index_timeout_secs: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_name: "vector_store".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            extensions: vec![".pdf".to_string(), ".txt".to_string(), ".md".to_string()],
            api_url: None,
            query_timeout_secs: 10,
            health_timeout_secs: 5,
            index_timeout_secs: 30,
        }
    }
}

/// Settings for incremental answer delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// Characters per simulated increment for already-complete answers
    #[serde(rename = "incrementChars")]
    pub increment_chars: usize,

    /// Pause between simulated increments, in milliseconds
    #[serde(rename = "pacingMs")]
    pub pacing_ms: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            increment_chars: 12,
            pacing_ms: 20,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    rag: Option<RagSettings>,
    delivery: Option<DeliverySettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            rag: RagSettings::default(),
            delivery: DeliverySettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `DOCENT_WORKSPACE`: Override workspace path
    /// - `DOCENT_CONFIG`: Path to config file
    /// - `DOCENT_PROVIDER`: Generation provider
    /// - `DOCENT_MODEL`: Chat model
    /// - `DOCENT_API_KEY` / `OPENAI_API_KEY`: API key
    /// - `DOCENT_EMBEDDING_BACKEND`: Embedding backend
    /// - `DOCENT_RAG_API_URL`: Remote retrieval service
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// When no embedding backend is configured anywhere, remote embeddings are
    /// used if an API key is available and the local model otherwise.
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("DOCENT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("DOCENT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.docent_dir().join("config.yaml"));

        let mut embedding_configured = false;
        if config_path.exists() {
            let file = read_config_file(&config_path)?;
            embedding_configured = file.embedding.is_some();
            config = config.merge_file(file);
        }

        if let Ok(provider) = std::env::var("DOCENT_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCENT_MODEL") {
            config.llm.model = model;
        }

        if let Ok(key) =
            std::env::var("DOCENT_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            config.llm.api_key = Some(key);
        }

        if let Ok(backend) = std::env::var("DOCENT_EMBEDDING_BACKEND") {
            config.embedding = match backend.as_str() {
                "openai" => EmbeddingSettings::remote(),
                "ollama" => EmbeddingSettings::local(),
                other => EmbeddingSettings {
                    backend: other.to_string(),
                    ..EmbeddingSettings::local()
                },
            };
            embedding_configured = true;
        }

        if !embedding_configured && config.llm.api_key.is_some() {
            config.embedding = EmbeddingSettings::remote();
        }

        if let Ok(url) = std::env::var("DOCENT_RAG_API_URL") {
            config.rag.api_url = Some(url);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = format;
            }
        }

        if let Some(llm) = file.llm {
            self.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(rag) = file.rag {
            self.rag = rag;
        }
        if let Some(delivery) = file.delivery {
            self.delivery = delivery;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docent directory.
    pub fn docent_dir(&self) -> PathBuf {
        self.workspace.join(".docent")
    }

    /// Ensure the .docent directory exists.
    pub fn ensure_docent_dir(&self) -> AppResult<()> {
        let dir = self.docent_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .docent directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Data directory, resolved against the workspace when relative.
    pub fn data_dir(&self) -> PathBuf {
        if self.rag.data_dir.is_absolute() {
            self.rag.data_dir.clone()
        } else {
            self.workspace.join(&self.rag.data_dir)
        }
    }

    /// Validate the configuration.
    ///
    /// Invalid chunk sizing and unknown backends are configuration errors,
    /// fatal before any component is constructed.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_BACKENDS.contains(&self.embedding.backend.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding backend: {}. Supported: {}",
                self.embedding.backend,
                KNOWN_EMBEDDING_BACKENDS.join(", ")
            )));
        }

        let needs_key = self.llm.provider == "openai" || self.embedding.backend == "openai";
        if needs_key && self.llm.api_key.is_none() {
            return Err(AppError::Config(
                "API key not found: set DOCENT_API_KEY or OPENAI_API_KEY".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(AppError::Config(
                "Embedding dimension must be positive".to_string(),
            ));
        }

        if self.rag.chunk_size == 0 {
            return Err(AppError::Config("Chunk size must be positive".to_string()));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("top_k must be positive".to_string()));
        }

        Ok(())
    }
}

fn read_config_file(path: &Path) -> AppResult<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

    serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
}
