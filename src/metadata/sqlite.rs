//! SQLite-backed article metadata store.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{info, warn};

use super::{Article, ArticleProjection, InsertOutcome, MetadataStore};
use crate::types::RagError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    abstract TEXT NOT NULL,
    authors TEXT NOT NULL,
    publication_date TEXT,
    source TEXT NOT NULL
)";

/// Article store over a single SQLite connection.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    conn: Connection,
}

impl SqliteMetadataStore {
    /// Opens (and if needed creates) the store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::unavailable("metadata store", err.to_string()))?;
        Self::init(conn).await
    }

    /// In-memory store, used by tests and throwaway runs.
    pub async fn open_in_memory() -> Result<Self, RagError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::unavailable("metadata store", err.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, RagError> {
        conn.call(|conn| {
            conn.execute(SCHEMA, [])
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Self { conn })
    }
}

fn parse_stored_date(text: Option<String>) -> Option<NaiveDate> {
    text.and_then(|text| NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok())
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn insert(&self, article: &Article) -> Result<InsertOutcome, RagError> {
        let article = article.clone();
        let id_for_log = article.id.clone();
        let outcome = self
            .conn
            .call(move |conn| {
                let exists = conn
                    .query_row(
                        "SELECT 1 FROM articles WHERE id = ?",
                        [&article.id],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                if exists.is_some() {
                    return Ok(InsertOutcome::AlreadyExists);
                }

                let authors_json = serde_json::to_string(&article.authors)
                    .map_err(|err| tokio_rusqlite::Error::Other(Box::new(err)))?;
                let date_text = article
                    .publication_date
                    .map(|d| d.format("%Y-%m-%d").to_string());
                // OR IGNORE keeps a concurrent duplicate insert a no-op
                // instead of a hard failure.
                conn.execute(
                    "INSERT OR IGNORE INTO articles \
                     (id, title, abstract, authors, publication_date, source) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        article.id,
                        article.title,
                        article.abstract_text,
                        authors_json,
                        date_text,
                        article.source,
                    ],
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(InsertOutcome::Inserted)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        match outcome {
            InsertOutcome::Inserted => info!(id = %id_for_log, "inserted article"),
            InsertOutcome::AlreadyExists => {
                info!(id = %id_for_log, "article already present, skipping insert")
            }
        }
        Ok(outcome)
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn list_all(&self) -> Result<Vec<Article>, RagError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, title, abstract, authors, publication_date, source \
                         FROM articles",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map([], |row| {
                        let authors_json: String = row.get(3)?;
                        let date_text: Option<String> = row.get(4)?;
                        Ok(Article {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            abstract_text: row.get(2)?,
                            authors: serde_json::from_str(&authors_json).unwrap_or_default(),
                            publication_date: parse_stored_date(date_text),
                            source: row.get(5)?,
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut articles = Vec::new();
                for row in rows {
                    articles.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(articles)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn list_projections(
        &self,
        ids: Option<&[String]>,
    ) -> Result<Vec<ArticleProjection>, RagError> {
        let filter = ids.map(<[String]>::to_vec);
        self.conn
            .call(move |conn| {
                let mut sql = String::from("SELECT id, title, authors FROM articles");
                let filter = filter.unwrap_or_default();
                if !filter.is_empty() {
                    let placeholders = vec!["?"; filter.len()].join(",");
                    sql.push_str(&format!(" WHERE id IN ({placeholders})"));
                }

                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let rows = stmt
                    .query_map(params_from_iter(filter.iter()), |row| {
                        let authors_json: String = row.get(2)?;
                        Ok(ArticleProjection {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            authors: serde_json::from_str(&authors_json).unwrap_or_default(),
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut projections = Vec::new();
                for row in rows {
                    projections.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(projections)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn clear(&self) -> Result<usize, RagError> {
        let deleted = self
            .conn
            .call(|conn| {
                conn.execute("DELETE FROM articles", [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        warn!(deleted, "cleared article metadata");
        Ok(deleted)
    }
}
