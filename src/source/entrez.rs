//! NCBI Entrez E-utilities client.
//!
//! Two endpoints are used: `esearch.fcgi` (term -> PMID list, JSON) and
//! `efetch.fcgi` (PMID list -> MEDLINE text). The base URL is configurable so
//! tests can point the client at a mock server.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::medline::parse_medline;
use super::{BibliographicSource, RawRecord};
use crate::types::RagError;

/// Public E-utilities endpoint.
pub const DEFAULT_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";

/// HTTP client for PubMed search and fetch.
#[derive(Clone, Debug)]
pub struct EntrezClient {
    http: Client,
    base: Url,
    /// Contact address the E-utilities terms of use ask for.
    email: String,
}

impl EntrezClient {
    pub fn new(http: Client, email: impl Into<String>) -> Result<Self, RagError> {
        Self::with_base_url(http, DEFAULT_EUTILS_BASE, email)
    }

    pub fn with_base_url(
        http: Client,
        base: &str,
        email: impl Into<String>,
    ) -> Result<Self, RagError> {
        let base = Url::parse(base)
            .map_err(|err| RagError::Validation(format!("invalid Entrez base url: {err}")))?;
        Ok(Self {
            http,
            base,
            email: email.into(),
        })
    }

    fn endpoint(&self, name: &str) -> Result<Url, RagError> {
        self.base
            .join(name)
            .map_err(|err| RagError::Source(format!("bad endpoint {name}: {err}")))
    }
}

#[derive(Deserialize)]
struct EsearchEnvelope {
    esearchresult: EsearchResult,
}

#[derive(Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[async_trait]
impl BibliographicSource for EntrezClient {
    #[instrument(skip(self), fields(term, limit))]
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<String>, RagError> {
        let url = self.endpoint("esearch.fcgi")?;
        let retmax = limit.to_string();
        let response = self
            .http
            .get(url)
            .query(&[
                ("db", "pubmed"),
                ("term", term),
                ("retmax", retmax.as_str()),
                ("retmode", "json"),
                ("email", self.email.as_str()),
            ])
            .send()
            .await
            .map_err(|err| RagError::unavailable("entrez", err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::Source(format!("esearch failed: {err}")))?;

        let envelope: EsearchEnvelope = response
            .json()
            .await
            .map_err(|err| RagError::Source(format!("esearch returned unexpected shape: {err}")))?;

        debug!(
            ids = envelope.esearchresult.idlist.len(),
            "esearch complete"
        );
        Ok(envelope.esearchresult.idlist)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn fetch(&self, ids: &[String]) -> Result<Vec<RawRecord>, RagError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint("efetch.fcgi")?;
        let joined = ids.join(",");
        let response = self
            .http
            .get(url)
            .query(&[
                ("db", "pubmed"),
                ("id", joined.as_str()),
                ("rettype", "medline"),
                ("retmode", "text"),
                ("email", self.email.as_str()),
            ])
            .send()
            .await
            .map_err(|err| RagError::unavailable("entrez", err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::Source(format!("efetch failed: {err}")))?;

        let payload = response
            .text()
            .await
            .map_err(|err| RagError::Source(format!("efetch body unreadable: {err}")))?;

        let records = parse_medline(&payload);
        debug!(records = records.len(), "efetch complete");
        Ok(records)
    }
}
