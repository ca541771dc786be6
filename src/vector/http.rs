//! Embedding provider backed by an HTTP inference endpoint.
//!
//! Speaks the plain `{"inputs": [...]} -> [[f32]]` shape used by common
//! text-embedding servers, so a locally hosted sentence-transformer can stand
//! in for the model without code changes.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::EmbeddingProvider;
use crate::types::RagError;

#[derive(Clone, Debug)]
pub struct HttpEmbeddingProvider {
    http: Client,
    endpoint: Url,
    dimensions: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(http: Client, endpoint: &str, dimensions: usize) -> Result<Self, RagError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| RagError::Validation(format!("invalid embedding endpoint: {err}")))?;
        Ok(Self {
            http,
            endpoint,
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Err(RagError::Embedding("empty embedding batch".to_string()));
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "inputs": texts }))
            .send()
            .await
            .map_err(|err| RagError::unavailable("embedding model", err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::Embedding(format!("embedding request failed: {err}")))?;

        let vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(format!("unexpected embedding shape: {err}")))?;

        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "embedding count mismatch: {} inputs, {} vectors",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RagError::Embedding(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                bad.len()
            )));
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
