//! Ingestion pipeline: search, fetch, parse, dual-write.
//!
//! One request runs the stages in order and stops at the first unrecoverable
//! condition. Malformed individual records are skipped with a warning rather
//! than aborting their siblings. The dual write is deliberately uncoupled:
//! article metadata goes in one insert per record, chunks go in a single
//! batched upsert for the whole run, and either side can fail while the other
//! succeeds. The report keeps both outcomes visible so an operator can
//! reconcile.

use std::sync::Arc;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chunker::{DEFAULT_SENTENCES_PER_CHUNK, chunk_id, chunk_sentences};
use crate::metadata::{Article, InsertOutcome, MetadataStore};
use crate::source::{BibliographicSource, RawRecord};
use crate::types::RagError;
use crate::vector::{ChunkMetadata, ChunkStore};

/// Provenance tag written to every article produced by this pipeline.
pub const SOURCE_TAG: &str = "PubMed";

const MISSING_TITLE: &str = "No Title Available";
const MISSING_ABSTRACT: &str = "No Abstract Available";

/// One ingestion request.
#[derive(Clone, Debug, Deserialize)]
pub struct IngestRequest {
    pub term: String,
    pub max_results: usize,
}

/// Per-phase outcome of an ingestion run. `inserted + already_present +
/// metadata_failures` equals the number of parsed records; `skipped` counts
/// records dropped during parsing. A chunk-store failure lands in
/// `chunk_write_error` instead of failing the run, because by then the
/// metadata phase has already happened and its outcome must not be lost.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IngestReport {
    pub term: String,
    /// Identifiers returned by the search stage.
    pub matched: usize,
    /// Records successfully parsed into articles.
    pub parsed: usize,
    /// Records skipped during parsing (missing identifier).
    pub skipped: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub metadata_failures: usize,
    pub chunks_written: usize,
    pub chunk_write_error: Option<String>,
}

/// Orchestrates source fetch, parsing, chunking, and the dual write.
pub struct IngestionPipeline {
    source: Arc<dyn BibliographicSource>,
    metadata: Arc<dyn MetadataStore>,
    chunks: Arc<dyn ChunkStore>,
    sentences_per_chunk: usize,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn BibliographicSource>,
        metadata: Arc<dyn MetadataStore>,
        chunks: Arc<dyn ChunkStore>,
    ) -> Self {
        Self {
            source,
            metadata,
            chunks,
            sentences_per_chunk: DEFAULT_SENTENCES_PER_CHUNK,
        }
    }

    /// Runs one ingestion request to completion. Fails fast on validation
    /// errors, an unreachable source, zero search results, or an empty fetch;
    /// per-record problems are isolated and reported instead.
    pub async fn run(&self, request: &IngestRequest) -> Result<IngestReport, RagError> {
        let term = request.term.trim();
        if term.is_empty() {
            return Err(RagError::Validation("search term must not be empty".into()));
        }
        if request.max_results == 0 {
            return Err(RagError::Validation(
                "max_results must be a positive integer".into(),
            ));
        }

        info!(term, max_results = request.max_results, "ingestion started");

        let ids = self.source.search(term, request.max_results).await?;
        if ids.is_empty() {
            return Err(RagError::Source(format!("no articles found for term '{term}'")));
        }
        info!(term, matched = ids.len(), "search complete");

        let records = self.source.fetch(&ids).await?;
        if records.is_empty() {
            return Err(RagError::Source(format!(
                "fetch returned no records for {} identifiers",
                ids.len()
            )));
        }

        let mut report = IngestReport {
            term: term.to_string(),
            matched: ids.len(),
            ..IngestReport::default()
        };

        let mut articles = Vec::new();
        let mut chunk_ids = Vec::new();
        let mut chunk_texts = Vec::new();
        let mut chunk_metadatas = Vec::new();

        for (position, record) in records.iter().enumerate() {
            let Some(parsed) = parse_record(record, self.sentences_per_chunk) else {
                warn!(term, position, "skipping record with missing identifier");
                report.skipped += 1;
                continue;
            };
            report.parsed += 1;

            for (index, text) in parsed.chunk_texts.iter().enumerate() {
                chunk_ids.push(chunk_id(&parsed.article.id, index));
                chunk_texts.push(text.clone());
                chunk_metadatas.push(ChunkMetadata {
                    article_id: parsed.article.id.clone(),
                    chunk_index: index,
                    title: parsed.article.title.clone(),
                    source: "abstract".to_string(),
                });
            }
            articles.push(parsed.article);
        }

        // Metadata phase: one insert per record so a bad record cannot block
        // its siblings.
        for article in &articles {
            match self.metadata.insert(article).await {
                Ok(InsertOutcome::Inserted) => report.inserted += 1,
                Ok(InsertOutcome::AlreadyExists) => report.already_present += 1,
                Err(err) => {
                    warn!(term, id = %article.id, %err, "metadata insert failed");
                    report.metadata_failures += 1;
                }
            }
        }

        // Vector phase: one batched upsert covering every chunk of the run.
        // Not transactionally coupled to the metadata phase.
        if chunk_ids.is_empty() {
            warn!(term, "no chunks generated for the vector store");
        } else {
            match self
                .chunks
                .upsert(&chunk_ids, &chunk_texts, &chunk_metadatas)
                .await
            {
                Ok(written) => report.chunks_written = written,
                Err(err) => {
                    warn!(term, %err, "batched chunk write failed");
                    report.chunk_write_error = Some(err.to_string());
                }
            }
        }

        info!(
            term,
            matched = report.matched,
            parsed = report.parsed,
            skipped = report.skipped,
            inserted = report.inserted,
            already_present = report.already_present,
            chunks_written = report.chunks_written,
            "ingestion complete"
        );
        Ok(report)
    }
}

struct ParsedRecord {
    article: Article,
    chunk_texts: Vec<String>,
}

/// Converts a raw record into an article plus its chunk texts. Returns `None`
/// only when the mandatory identifier is missing; every other field falls
/// back to a placeholder or absent value.
fn parse_record(record: &RawRecord, sentences_per_chunk: usize) -> Option<ParsedRecord> {
    let id = record.id.as_deref()?.trim();
    if id.is_empty() {
        return None;
    }

    let title = record
        .title
        .clone()
        .unwrap_or_else(|| MISSING_TITLE.to_string());
    let abstract_text = record
        .abstract_text
        .clone()
        .unwrap_or_else(|| MISSING_ABSTRACT.to_string());
    let publication_date = record
        .publication_date
        .as_deref()
        .and_then(|raw| parse_publication_date(id, raw));

    let chunk_texts = chunk_sentences(&abstract_text, sentences_per_chunk);

    Some(ParsedRecord {
        article: Article {
            id: id.to_string(),
            title,
            abstract_text,
            authors: record.authors.clone(),
            publication_date,
            source: SOURCE_TAG.to_string(),
        },
        chunk_texts,
    })
}

static FULL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4} [A-Za-z]{3} \d{1,2}$").expect("date regex"));
static YEAR_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4} [A-Za-z]{3}$").expect("date regex"));
static YEAR_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("date regex"));

/// Parses a raw publication date against the three shapes the source emits
/// (`2023 Jan 15`, `2023 Jan`, `2023`), in that priority order. Missing
/// precision fills with the first day/month. Never fails the record; an
/// unrecognized or invalid date becomes `None` with a logged warning.
fn parse_publication_date(id: &str, raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let attempt = if FULL_DATE.is_match(raw) {
        NaiveDate::parse_from_str(raw, "%Y %b %d")
    } else if YEAR_MONTH.is_match(raw) {
        NaiveDate::parse_from_str(&format!("{raw} 1"), "%Y %b %d")
    } else if YEAR_ONLY.is_match(raw) {
        NaiveDate::parse_from_str(&format!("{raw} Jan 1"), "%Y %b %d")
    } else {
        warn!(id, raw, "unrecognized publication date format");
        return None;
    };

    match attempt {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(id, raw, %err, "could not parse publication date");
            None
        }
    }
}
