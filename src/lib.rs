//! ```text
//! PubMed (Entrez) ──► ingestion::IngestionPipeline ──┬─► metadata::MetadataStore
//!                                  │                 │        │
//!                        chunker::chunk_sentences    │        └─► graph::build_graph
//!                                  │                 │
//!                                  └─► vector::ChunkStore (embed + upsert)
//!
//! Question ──► query::RagOrchestrator ──┬─► vector::ChunkStore (retrieve)
//!                                       └─► query::GeminiClient (generate)
//! ```
//!
//! Literature ingestion, co-authorship graphs, and retrieval-augmented
//! question answering over PubMed records. The two stores fail independently
//! and the dual write is deliberately untransactional; see
//! [`ingestion::IngestReport`] for how per-phase outcomes are surfaced.

pub mod chunker;
pub mod config;
pub mod context;
pub mod graph;
pub mod ingestion;
pub mod metadata;
pub mod query;
pub mod source;
pub mod types;
pub mod vector;

pub use config::AppConfig;
pub use context::AppContext;
pub use types::RagError;
