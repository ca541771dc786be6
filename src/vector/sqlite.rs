//! SQLite chunk store with vector search via `sqlite-vec`.
//!
//! Chunks live in a plain `chunks` table; their embeddings sit in a sibling
//! `chunk_embeddings` table keyed by the same content-addressed id. Similarity
//! queries join the two and rank by `vec_distance_cosine`, ascending.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::{Arc, Once};

use async_trait::async_trait;
use tokio_rusqlite::{Connection, ffi, params};
use tracing::{debug, warn};

use super::{ChunkMetadata, ChunkStore, EmbeddingProvider, ScoredChunk, validate_upsert_lengths};
use crate::types::RagError;

const CHUNKS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    article_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    title TEXT NOT NULL,
    source TEXT NOT NULL,
    content TEXT NOT NULL
)";

const EMBEDDINGS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS chunk_embeddings (
    id TEXT PRIMARY KEY,
    embedding BLOB NOT NULL
)";

/// Vector store over a single SQLite connection plus an embedding provider.
#[derive(Clone)]
pub struct SqliteChunkStore {
    conn: Connection,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteChunkStore {
    /// Opens the store at `path`, registering the `sqlite-vec` extension and
    /// verifying it loads before any data work.
    pub async fn open(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::unavailable("vector store", err.to_string()))?;
        Self::init(conn, embedder).await
    }

    /// In-memory store for tests and throwaway runs.
    pub async fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::unavailable("vector store", err.to_string()))?;
        Self::init(conn, embedder).await
    }

    async fn init(conn: Connection, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, RagError> {
        conn.call(|conn| {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            conn.execute(CHUNKS_SCHEMA, [])
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            conn.execute(EMBEDDINGS_SCHEMA, [])
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::unavailable("vector store", err.to_string()))?;
        Ok(Self { conn, embedder })
    }

    fn register_sqlite_vec() -> Result<(), RagError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *const c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(|reason| RagError::unavailable("vector store", reason))
    }
}

fn vector_json(vector: &[f32]) -> Result<String, RagError> {
    serde_json::to_string(vector).map_err(|err| RagError::Storage(err.to_string()))
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn upsert(
        &self,
        ids: &[String],
        texts: &[String],
        metadatas: &[ChunkMetadata],
    ) -> Result<usize, RagError> {
        validate_upsert_lengths(ids, texts, metadatas)?;
        if ids.is_empty() {
            return Ok(0);
        }

        // Embed first: a model failure must abort before anything is written.
        let embeddings = self.embedder.embed_batch(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "model returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        let mut rows = Vec::with_capacity(ids.len());
        for (((id, text), metadata), embedding) in ids
            .iter()
            .zip(texts.iter())
            .zip(metadatas.iter())
            .zip(embeddings.iter())
        {
            rows.push((
                id.clone(),
                text.clone(),
                metadata.clone(),
                vector_json(embedding)?,
            ));
        }

        let written = rows.len();
        self.conn
            .call(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                for (id, text, metadata, embedding_json) in rows {
                    // Ids are content-addressed, so REPLACE rewrites an
                    // identical row on re-ingestion.
                    tx.execute(
                        "INSERT OR REPLACE INTO chunks \
                         (id, article_id, chunk_index, title, source, content) \
                         VALUES (?, ?, ?, ?, ?, ?)",
                        params![
                            id,
                            metadata.article_id,
                            metadata.chunk_index as i64,
                            metadata.title,
                            metadata.source,
                            text,
                        ],
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    tx.execute(
                        "INSERT OR REPLACE INTO chunk_embeddings (id, embedding) \
                         VALUES (?, vec_f32(?))",
                        params![id, embedding_json],
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        debug!(written, "upserted chunk batch");
        Ok(written)
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        if text.trim().is_empty() {
            return Err(RagError::Validation("empty query text".to_string()));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_batch(&[text.to_string()]).await?;
        let query_vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("model returned no query vector".to_string()))?;
        let embedding_json = vector_json(&query_vector)?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT c.content, c.article_id, c.chunk_index, c.title, c.source, \
                         vec_distance_cosine(e.embedding, vec_f32(?)) AS distance \
                         FROM chunks c \
                         JOIN chunk_embeddings e ON c.id = e.id \
                         ORDER BY distance ASC \
                         LIMIT {top_k}"
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        Ok(ScoredChunk {
                            document: row.get(0)?,
                            metadata: ChunkMetadata {
                                article_id: row.get(1)?,
                                chunk_index: row.get::<_, i64>(2)? as usize,
                                title: row.get(3)?,
                                source: row.get(4)?,
                            },
                            distance: row.get(5)?,
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn clear(&self) -> Result<(), RagError> {
        self.conn
            .call(|conn| {
                conn.execute("DROP TABLE IF EXISTS chunks", [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                conn.execute("DROP TABLE IF EXISTS chunk_embeddings", [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                conn.execute(CHUNKS_SCHEMA, [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                conn.execute(EMBEDDINGS_SCHEMA, [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        warn!("dropped and recreated chunk index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::vector::MockEmbeddingProvider;

    /// Maps exact texts to pre-chosen vectors so tests control distances.
    struct FixedEmbeddingProvider {
        vectors: HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbeddingProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            texts
                .iter()
                .map(|text| {
                    self.vectors
                        .get(text)
                        .cloned()
                        .ok_or_else(|| RagError::Embedding(format!("no vector for '{text}'")))
                })
                .collect()
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn meta(article_id: &str, index: usize) -> ChunkMetadata {
        ChunkMetadata {
            article_id: article_id.to_string(),
            chunk_index: index,
            title: format!("Title {article_id}"),
            source: "abstract".to_string(),
        }
    }

    fn fixed_provider() -> Arc<dyn EmbeddingProvider> {
        let vectors = HashMap::from([
            ("near".to_string(), vec![1.0, 0.0]),
            ("mid".to_string(), vec![0.8, 0.6]),
            ("far".to_string(), vec![0.0, 1.0]),
            ("the query".to_string(), vec![1.0, 0.0]),
        ]);
        Arc::new(FixedEmbeddingProvider { vectors })
    }

    #[tokio::test]
    async fn query_orders_by_distance_ascending_and_honors_k() {
        let store = SqliteChunkStore::open_in_memory(fixed_provider())
            .await
            .unwrap();

        let ids: Vec<String> = ["A_chunk_0", "A_chunk_1", "B_chunk_0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let texts: Vec<String> = ["far", "near", "mid"].iter().map(|s| s.to_string()).collect();
        let metas = vec![meta("A", 0), meta("A", 1), meta("B", 0)];

        assert_eq!(store.upsert(&ids, &texts, &metas).await.unwrap(), 3);

        let hits = store.query("the query", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document, "near");
        assert_eq!(hits[1].document, "mid");
        assert!(hits[0].distance < hits[1].distance);
        assert!(hits[0].distance.abs() < 1e-5);
    }

    #[tokio::test]
    async fn query_on_empty_store_returns_nothing() {
        let store = SqliteChunkStore::open_in_memory(fixed_provider())
            .await
            .unwrap();
        let hits = store.query("the query", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn mismatched_batch_is_rejected_before_io() {
        let store = SqliteChunkStore::open_in_memory(fixed_provider())
            .await
            .unwrap();
        let err = store
            .upsert(
                &["a".to_string()],
                &["near".to_string(), "mid".to_string()],
                &[meta("A", 0)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn embedding_failure_short_circuits_upsert() {
        let store = SqliteChunkStore::open_in_memory(fixed_provider())
            .await
            .unwrap();
        let err = store
            .upsert(
                &["a".to_string()],
                &["unknown text".to_string()],
                &[meta("A", 0)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reingestion_rewrites_same_ids_without_duplicates() {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(MockEmbeddingProvider::with_dimensions(8));
        let store = SqliteChunkStore::open_in_memory(embedder).await.unwrap();

        let ids = vec!["P1_chunk_0".to_string(), "P1_chunk_1".to_string()];
        let texts = vec!["First chunk.".to_string(), "Second chunk.".to_string()];
        let metas = vec![meta("P1", 0), meta("P1", 1)];

        store.upsert(&ids, &texts, &metas).await.unwrap();
        store.upsert(&ids, &texts, &metas).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn clear_drops_and_recreates() {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(MockEmbeddingProvider::with_dimensions(8));
        let store = SqliteChunkStore::open_in_memory(embedder).await.unwrap();

        let ids = vec!["P1_chunk_0".to_string()];
        let texts = vec!["Some text here.".to_string()];
        let metas = vec![meta("P1", 0)];
        store.upsert(&ids, &texts, &metas).await.unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        // Store still usable after the reset.
        store.upsert(&ids, &texts, &metas).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
