//! Retrieval-augmented question answering.
//!
//! A query is embedded and matched against the chunk store, the nearest
//! chunks are assembled into a labeled context block (nearest first, so the
//! model sees the most relevant material first), and the context plus the
//! literal question go to the generation service. Lack of context never
//! refuses the question; it degrades to a fixed marker.

pub mod gemini;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::types::RagError;
use crate::vector::{ChunkStore, ScoredChunk};

pub use gemini::GeminiClient;

/// Context block used when retrieval returns nothing.
pub const NO_CONTEXT_MARKER: &str = "No relevant context found.";

/// Answer returned when the generation response is malformed.
pub const FALLBACK_ANSWER: &str = "Could not generate an answer.";

/// Number of chunks retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Bounded sampling parameters for the generation call.
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    /// Wall-clock ceiling for the generation request. A timeout is reported,
    /// never swallowed.
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Prompt-to-text capability of the remote generation model.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        api_key: &str,
        config: &GenerationConfig,
    ) -> Result<String, RagError>;
}

/// Structured answer: generated text plus the chunks that primed it, in
/// retrieval order.
#[derive(Clone, Debug, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub context: Vec<ScoredChunk>,
}

/// Assembles the labeled context block from retrieved chunks, nearest first.
pub fn assemble_context(chunks: &[ScoredChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_MARKER.to_string();
    }

    let mut context = String::new();
    for chunk in chunks {
        context.push_str(&format!(
            "--- Article: {} (PMID: {}) ---\n{}\n\n",
            chunk.metadata.title, chunk.metadata.article_id, chunk.document
        ));
    }
    context
}

/// Fixed instruction template wrapping the assembled context and the literal
/// question.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an AI assistant specialized in scientific literature.\n\
         Based on the following context, answer the question comprehensively \
         and accurately.\n\
         If the answer is not available in the context, state that clearly.\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\n\
         Answer:"
    )
}

/// Ties retrieval and generation together for one question.
pub struct RagOrchestrator {
    chunks: Arc<dyn ChunkStore>,
    generator: Arc<dyn GenerationService>,
    config: GenerationConfig,
    top_k: usize,
}

impl RagOrchestrator {
    pub fn new(chunks: Arc<dyn ChunkStore>, generator: Arc<dyn GenerationService>) -> Self {
        Self {
            chunks,
            generator,
            config: GenerationConfig::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Answers `query` using retrieved context. An empty retrieval degrades
    /// to the no-context marker; a missing credential is rejected before the
    /// generation call is made.
    pub async fn answer(
        &self,
        query: &str,
        api_key: Option<&str>,
    ) -> Result<QueryAnswer, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::Validation("query must not be empty".into()));
        }

        let retrieved = self.chunks.query(query, self.top_k).await?;
        if retrieved.is_empty() {
            warn!(query, "no context found for query");
        } else {
            info!(query, chunks = retrieved.len(), "retrieved context");
        }

        let context = assemble_context(&retrieved);
        let prompt = build_prompt(&context, query);

        let api_key = match api_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                return Err(RagError::Validation(
                    "generation API key is required but not provided".into(),
                ));
            }
        };

        let answer = self
            .generator
            .generate(&prompt, api_key, &self.config)
            .await?;

        Ok(QueryAnswer {
            answer,
            context: retrieved,
        })
    }
}
