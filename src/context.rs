//! Process-wide application context.
//!
//! All shared handles are constructed once at startup and passed by `Arc`
//! into pipelines and orchestrators. Nothing in the crate reaches for
//! ambient globals.

use std::sync::Arc;

use reqwest::Client;
use tracing::warn;

use crate::config::AppConfig;
use crate::ingestion::IngestionPipeline;
use crate::metadata::{MetadataStore, SqliteMetadataStore};
use crate::query::{GeminiClient, RagOrchestrator};
use crate::source::{BibliographicSource, EntrezClient};
use crate::types::RagError;
use crate::vector::{
    ChunkStore, EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider, SqliteChunkStore,
};

/// Shared handles to the stores and external collaborators.
#[derive(Clone)]
pub struct AppContext {
    pub metadata: Arc<dyn MetadataStore>,
    pub chunks: Arc<dyn ChunkStore>,
    pub source: Arc<dyn BibliographicSource>,
    pub generator: Arc<GeminiClient>,
}

impl AppContext {
    /// Builds every handle from configuration. Store connections are opened
    /// eagerly so an unreachable database fails startup, not the first
    /// request.
    pub async fn from_config(config: &AppConfig) -> Result<Self, RagError> {
        let http = Client::builder()
            .build()
            .map_err(|err| RagError::unavailable("http client", err.to_string()))?;

        let embedder: Arc<dyn EmbeddingProvider> = match &config.embedding_endpoint {
            Some(endpoint) => Arc::new(HttpEmbeddingProvider::new(
                http.clone(),
                endpoint,
                config.embedding_dimensions,
            )?),
            None => {
                warn!("no embedding endpoint configured, using the deterministic mock provider");
                Arc::new(MockEmbeddingProvider::with_dimensions(
                    config.embedding_dimensions,
                ))
            }
        };

        for path in [&config.metadata_db_path, &config.chunk_db_path] {
            if let Some(parent) = std::path::Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let metadata = Arc::new(SqliteMetadataStore::open(&config.metadata_db_path).await?);
        let chunks = Arc::new(SqliteChunkStore::open(&config.chunk_db_path, embedder).await?);
        let source = Arc::new(EntrezClient::with_base_url(
            http.clone(),
            &config.entrez_base_url,
            config.entrez_email.clone(),
        )?);
        let generator = Arc::new(GeminiClient::new(http, config.gemini_model.clone())?);

        Ok(Self {
            metadata,
            chunks,
            source,
            generator,
        })
    }

    /// Ingestion pipeline over this context's handles.
    pub fn pipeline(&self) -> IngestionPipeline {
        IngestionPipeline::new(
            self.source.clone(),
            self.metadata.clone(),
            self.chunks.clone(),
        )
    }

    /// Query orchestrator over this context's handles.
    pub fn orchestrator(&self) -> RagOrchestrator {
        RagOrchestrator::new(self.chunks.clone(), self.generator.clone())
    }

    /// Wipes both stores. Destructive; development and test resets only.
    pub async fn clear_all(&self) -> Result<(), RagError> {
        self.metadata.clear().await?;
        self.chunks.clear().await?;
        Ok(())
    }
}
