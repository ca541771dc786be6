//! Article metadata storage.
//!
//! Articles are keyed by their external identifier (PMID) and never mutated
//! after the first write: re-ingesting the same identifier is a skip, not an
//! update. The store is one of the two independently-failing destinations of
//! the dual write; see [`crate::ingestion`].

pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

pub use sqlite::SqliteMetadataStore;

/// One stored literature record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// External unique key (PMID). Sole uniqueness key in the store.
    pub id: String,
    pub title: String,
    pub abstract_text: String,
    /// Author display names in byline order. Order is significant downstream:
    /// the graph builder sorts its own copy before pairing.
    pub authors: Vec<String>,
    /// Normalized publication date, absent when the raw string was
    /// unparseable.
    pub publication_date: Option<NaiveDate>,
    /// Provenance tag, e.g. `PubMed`.
    pub source: String,
}

/// Identifier/title/authors projection used by the graph builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArticleProjection {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
}

/// Result of an idempotent insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The article was written.
    Inserted,
    /// An article with this identifier already existed; nothing was written.
    AlreadyExists,
}

/// Idempotent CRUD over article records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Inserts `article` unless its identifier is already present.
    /// Skip-on-conflict, never overwrite.
    async fn insert(&self, article: &Article) -> Result<InsertOutcome, RagError>;

    /// Total number of stored articles.
    async fn count(&self) -> Result<usize, RagError>;

    /// All stored articles, in unspecified order.
    async fn list_all(&self) -> Result<Vec<Article>, RagError>;

    /// Projections for the graph builder, optionally restricted to `ids`.
    async fn list_projections(
        &self,
        ids: Option<&[String]>,
    ) -> Result<Vec<ArticleProjection>, RagError>;

    /// Removes every article. Returns the number of deleted rows.
    async fn clear(&self) -> Result<usize, RagError>;
}
