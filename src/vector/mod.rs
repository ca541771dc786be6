//! Embedding generation and vector similarity storage.
//!
//! The embedding model and the vector index are both black boxes to the rest
//! of the pipeline: [`EmbeddingProvider`] turns text into fixed-dimension
//! vectors as a unit, and [`ChunkStore`] persists embedded chunks and answers
//! nearest-neighbor queries ordered by ascending distance.

pub mod http;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

pub use http::HttpEmbeddingProvider;
pub use sqlite::SqliteChunkStore;

/// Metadata carried alongside each stored chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub article_id: String,
    pub chunk_index: usize,
    pub title: String,
    /// Which part of the article the text came from, e.g. `abstract`.
    pub source: String,
}

/// One retrieved chunk with its similarity distance (lower is closer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub document: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

/// Text-to-vector capability. Batch embedding either succeeds for every
/// input or fails as a unit; partial success is not modeled.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Length of every vector this provider produces.
    fn dimensions(&self) -> usize;
}

/// Upsert-and-query capability over a persistent vector index.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Embeds `texts` and writes them under `ids`. The three slices must be
    /// the same length; a mismatch is a caller error rejected before any I/O.
    /// An embedding failure aborts the whole call without writing.
    async fn upsert(
        &self,
        ids: &[String],
        texts: &[String],
        metadatas: &[ChunkMetadata],
    ) -> Result<usize, RagError>;

    /// Returns up to `top_k` chunks nearest to `text`, distance ascending.
    /// An empty store yields an empty result, not an error.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredChunk>, RagError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, RagError>;

    /// Drops and recreates the index. Destructive; full resets only.
    async fn clear(&self) -> Result<(), RagError>;
}

/// Shared caller-input validation for [`ChunkStore::upsert`] implementations.
pub fn validate_upsert_lengths(
    ids: &[String],
    texts: &[String],
    metadatas: &[ChunkMetadata],
) -> Result<(), RagError> {
    if ids.len() != texts.len() || ids.len() != metadatas.len() {
        return Err(RagError::Validation(format!(
            "upsert batch lengths differ: {} ids, {} texts, {} metadatas",
            ids.len(),
            texts.len(),
            metadatas.len()
        )));
    }
    Ok(())
}

/// Deterministic embedding provider for tests and offline runs.
///
/// Vectors are seeded from a hash of the input text, so identical text always
/// embeds identically and distinct text almost never collides.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 384 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        // FNV-1a seed, then an LCG to fill the vector.
        let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.as_bytes() {
            seed ^= u64::from(*byte);
            seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
        }

        let mut state = seed | 1;
        let mut vector = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let unit = (state >> 11) as f32 / (1u64 << 53) as f32;
            vector.push(unit * 2.0 - 1.0);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
