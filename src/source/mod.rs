//! Bibliographic source boundary.
//!
//! The pipeline depends only on [`BibliographicSource`]; the concrete NCBI
//! Entrez client lives in [`entrez`] and can be swapped for a deterministic
//! fake in tests.

pub mod entrez;
pub mod medline;

use async_trait::async_trait;

use crate::types::RagError;

pub use entrez::EntrezClient;

/// Raw record as returned by the source, before validation. Every field may
/// be absent; the parsing stage decides what is mandatory.
#[derive(Clone, Debug, Default)]
pub struct RawRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    /// Unparsed publication date string, e.g. `2023 Jan 15`.
    pub publication_date: Option<String>,
}

/// Search-and-fetch capability over an external bibliographic database.
#[async_trait]
pub trait BibliographicSource: Send + Sync {
    /// Returns at most `limit` matching record identifiers for `term`.
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<String>, RagError>;

    /// Fetches the full records for `ids` in one batch call.
    async fn fetch(&self, ids: &[String]) -> Result<Vec<RawRecord>, RagError>;
}
