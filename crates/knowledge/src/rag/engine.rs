//! RAG answering orchestration.
//!
//! Retrieves relevant chunks and generates grounded answers via the LLM.

use super::prompt::{build_user_prompt, format_context, SYSTEM_PROMPT};
use super::types::{RagAnswer, SourceRef};
use crate::chunker::Chunker;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::{IndexMeta, IndexPaths};
use crate::types::{IndexEntry, RetrievalResult};
use crate::vector_index::VectorIndex;
use docent_core::{AppConfig, AppError, AppResult};
use docent_llm::{create_client, LlmClient, LlmRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Where the engine reads documents and how it calls the generator.
#[derive(Debug, Clone)]
pub struct RagOptions {
    /// Source documents and persisted index live here
    pub data_dir: PathBuf,

    /// Base name of the persisted index artifacts
    pub index_name: String,

    /// File extensions picked up when indexing
    pub extensions: Vec<String>,

    /// Generation model
    pub model: String,

    pub temperature: f32,
}

impl RagOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            index_name: "vector_store".to_string(),
            extensions: vec![".pdf".to_string(), ".txt".to_string(), ".md".to_string()],
            model: docent_core::config::DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.7,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            data_dir: config.data_dir(),
            index_name: config.rag.index_name.clone(),
            extensions: config.rag.extensions.clone(),
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
        }
    }

    fn index_paths(&self) -> IndexPaths {
        IndexPaths::new(&self.data_dir, &self.index_name)
    }
}

/// Retrieval-augmented answering over one document collection.
///
/// The index sits behind a read/write lock: searches run concurrently,
/// swapping, saving and loading take exclusive access. Rebuilds are
/// serialized so two re-indexes never persist out of order.
pub struct RagEngine {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<RwLock<VectorIndex>>,
    rebuild: Mutex<()>,
    llm: Arc<dyn LlmClient>,
    options: RagOptions,
}

impl RagEngine {
    /// Assemble an engine from its parts.
    ///
    /// # Errors
    /// `AppError::Config` when the embedder's dimension differs from the
    /// index dimension.
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: VectorIndex,
        llm: Arc<dyn LlmClient>,
        options: RagOptions,
    ) -> AppResult<Self> {
        check_dimension(embedder.as_ref(), index.dimension())?;

        Ok(Self {
            chunker,
            embedder,
            index: Arc::new(RwLock::new(index)),
            rebuild: Mutex::new(()),
            llm,
            options,
        })
    }

    /// Build every component from application configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let api_key = config.llm.api_key.as_deref();

        let chunker = Chunker::from_settings(&config.rag)?;
        let embedder = create_provider(&config.embedding, api_key)?;
        let index = VectorIndex::new(config.embedding.dimension)?;
        let llm = create_client(
            &config.llm.provider,
            config.llm.endpoint.as_deref(),
            api_key,
        )?;

        tracing::info!(
            "RAG engine: embeddings {}/{} ({} dims), generation {}/{}",
            embedder.provider_name(),
            embedder.model_name(),
            embedder.dimensions(),
            llm.provider_name(),
            config.llm.model
        );

        Self::new(chunker, embedder, index, llm, RagOptions::from_config(config))
    }

    pub fn options(&self) -> &RagOptions {
        &self.options
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    /// Embed the query and return the `top_k` nearest chunks, best first.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievalResult>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.index.read().await.search(&query_embedding, top_k)?;

        if let Some(best) = results.first() {
            tracing::debug!(
                "Retrieved {} chunks (top score: {:.3})",
                results.len(),
                best.score
            );
        } else {
            tracing::debug!("Retrieved no chunks");
        }

        Ok(results)
    }

    /// Answer a query from retrieved context.
    ///
    /// With no retrieved chunks the canned no-context answer is returned and
    /// the generator is not called. Embedding and generation errors
    /// propagate.
    pub async fn answer_question(&self, query: &str, top_k: usize) -> AppResult<RagAnswer> {
        tracing::info!("Answering query with top_k={}", top_k);

        let results = self.retrieve(query, top_k).await?;
        if results.is_empty() {
            tracing::info!("No context found, skipping generation");
            return Ok(RagAnswer::no_context());
        }

        let context = format_context(&results);
        let answer = self.generate(&context, query).await?;

        Ok(RagAnswer {
            answer,
            sources: results.iter().map(SourceRef::from).collect(),
            has_context: true,
        })
    }

    async fn generate(&self, context: &str, query: &str) -> AppResult<String> {
        let request = LlmRequest::from_prompt(build_user_prompt(context, query), &self.options.model)
            .with_system(SYSTEM_PROMPT)
            .with_temperature(self.options.temperature);

        let response = self.llm.complete(&request).await?;

        tracing::debug!(
            "Generated answer: {} prompt tokens, {} completion tokens",
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        Ok(response.content)
    }

    /// Chunk, embed and index every supported file in `dir`.
    ///
    /// The new contents replace the current index only once everything has
    /// been embedded. Returns the number of chunks indexed.
    pub async fn index_directory(&self, dir: &Path) -> AppResult<usize> {
        let _rebuild = self.rebuild.lock().await;
        let fresh = self.build_index(dir).await?;

        let count = fresh.len();
        *self.index.write().await = fresh;

        tracing::info!("Indexed {} chunks", count);
        Ok(count)
    }

    async fn build_index(&self, dir: &Path) -> AppResult<VectorIndex> {
        tracing::info!("Indexing documents in {:?}", dir);

        let chunker = self.chunker.clone();
        let dir = dir.to_path_buf();
        let extensions = self.options.extensions.clone();
        let chunks = tokio::task::spawn_blocking(move || chunker.scan(&dir, &extensions))
            .await
            .map_err(|e| AppError::Knowledge(format!("Indexing task failed: {}", e)))??;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(AppError::Knowledge(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut fresh = VectorIndex::new(self.embedder.dimensions())?;
        fresh.add(
            embeddings
                .into_iter()
                .zip(chunks)
                .map(|(embedding, chunk)| IndexEntry::new(embedding, chunk))
                .collect(),
        )?;
        Ok(fresh)
    }

    /// Persist the index to the data directory.
    ///
    /// Holds exclusive access while writing so the artifacts always match
    /// one in-memory state.
    pub async fn save_index(&self) -> AppResult<IndexMeta> {
        let index = self.index.write().await;
        let (_, meta) = persist(index.clone(), &self.options).await?;
        Ok(meta)
    }

    /// Replace the index with the persisted one. Returns the item count.
    pub async fn load_index(&self) -> AppResult<usize> {
        let mut index = self.index.write().await;

        let dir = self.options.data_dir.clone();
        let name = self.options.index_name.clone();
        let loaded = tokio::task::spawn_blocking(move || VectorIndex::load(&dir, &name))
            .await
            .map_err(|e| AppError::Knowledge(format!("Index load task failed: {}", e)))??;
        check_dimension(self.embedder.as_ref(), loaded.dimension())?;

        let count = loaded.len();
        *index = loaded;
        Ok(count)
    }

    /// Full re-index of the data directory followed by a save.
    ///
    /// The rebuilt index is written to disk and swapped in under one write
    /// guard; if saving fails the previous index stays in place.
    pub async fn reindex(&self) -> AppResult<usize> {
        let data_dir = &self.options.data_dir;
        if !data_dir.is_dir() {
            return Err(AppError::Knowledge(format!(
                "Data directory {:?} not found",
                data_dir
            )));
        }

        let _rebuild = self.rebuild.lock().await;
        let fresh = self.build_index(data_dir).await?;

        let mut index = self.index.write().await;
        let (fresh, meta) = persist(fresh, &self.options).await?;
        *index = fresh;

        tracing::info!("Re-indexed and saved {} chunks", meta.count);
        Ok(meta.count)
    }

    /// Make the index ready for queries.
    ///
    /// Loads the persisted index when one exists, otherwise indexes the data
    /// directory and saves the result.
    pub async fn ensure_index(&self) -> AppResult<usize> {
        if self.options.index_paths().exists() {
            tracing::info!("Loading persisted index '{}'", self.options.index_name);
            self.load_index().await
        } else {
            tracing::info!("No persisted index found, indexing data directory");
            self.reindex().await
        }
    }
}

/// Write `index` on the blocking pool and hand it back with its metadata.
async fn persist(index: VectorIndex, options: &RagOptions) -> AppResult<(VectorIndex, IndexMeta)> {
    let dir = options.data_dir.clone();
    let name = options.index_name.clone();

    tokio::task::spawn_blocking(move || {
        let meta = index.save(&dir, &name)?;
        Ok((index, meta))
    })
    .await
    .map_err(|e| AppError::Knowledge(format!("Index save task failed: {}", e)))?
}

fn check_dimension(embedder: &dyn EmbeddingProvider, dimension: usize) -> AppResult<()> {
    if embedder.dimensions() != dimension {
        return Err(AppError::Config(format!(
            "Embedding backend '{}' produces {} dimensions but the index expects {}",
            embedder.provider_name(),
            embedder.dimensions(),
            dimension
        )));
    }
    Ok(())
}
