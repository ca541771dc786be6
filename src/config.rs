//! Environment-driven configuration.
//!
//! Everything has a default except the embedding endpoint, which has no
//! sensible public fallback. `.env` files are honored when present.

use std::env;

use crate::source::entrez::DEFAULT_EUTILS_BASE;
use crate::types::RagError;

const DEFAULT_METADATA_DB: &str = "./data/articles.db";
const DEFAULT_CHUNK_DB: &str = "./data/chunks.db";
const DEFAULT_ENTREZ_EMAIL: &str = "default@example.com";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Process configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub metadata_db_path: String,
    pub chunk_db_path: String,
    pub entrez_base_url: String,
    pub entrez_email: String,
    /// Embedding inference endpoint. `None` selects the deterministic mock
    /// provider, which is only useful for offline experimentation.
    pub embedding_endpoint: Option<String>,
    pub embedding_dimensions: usize,
    pub gemini_model: String,
    /// Fallback key when a request carries none of its own.
    pub gemini_api_key: Option<String>,
}

impl AppConfig {
    /// Loads configuration from the environment, after sourcing `.env` if
    /// one exists.
    pub fn from_env() -> Result<Self, RagError> {
        // Missing .env is fine; only a malformed one is worth surfacing.
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(RagError::Validation(format!("could not read .env: {err}")));
            }
        }

        let embedding_dimensions = match env::var("EMBEDDING_DIMENSIONS") {
            Ok(raw) => raw.parse::<usize>().map_err(|err| {
                RagError::Validation(format!("EMBEDDING_DIMENSIONS must be an integer: {err}"))
            })?,
            Err(_) => DEFAULT_EMBEDDING_DIMENSIONS,
        };

        Ok(Self {
            metadata_db_path: var_or("METADATA_DB_PATH", DEFAULT_METADATA_DB),
            chunk_db_path: var_or("CHUNK_DB_PATH", DEFAULT_CHUNK_DB),
            entrez_base_url: var_or("ENTREZ_BASE_URL", DEFAULT_EUTILS_BASE),
            entrez_email: var_or("ENTREZ_EMAIL", DEFAULT_ENTREZ_EMAIL),
            embedding_endpoint: env::var("EMBEDDING_ENDPOINT").ok(),
            embedding_dimensions,
            gemini_model: var_or("GEMINI_MODEL", crate::query::gemini::DEFAULT_GEMINI_MODEL),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
