// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementation of the [`MemoryStore`] trait.
//!
//! One `memories` table holds all three layers. Embeddings are stored as
//! little-endian f32 BLOBs; vector similarity is computed in-process after
//! candidate rows are loaded. The partial unique index on
//! `(owner_id, conversation_id, chunk_index, fact_hash)` turns duplicate fact
//! inserts into [`EngramError::DuplicateFact`].

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use engram_core::{
    EngramError, MemoryContext, MemoryContent, MemoryLayer, MemoryRecord, MemoryStore,
    SearchFilters,
};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations::run_migrations;
use crate::vector::{blob_to_vec, cosine_similarity, vec_to_blob};

const COLUMNS: &str = "id, owner_id, user_ids, room_id, conversation_id, layer, summary, content, keywords, importance, embedding, access_count, last_accessed, created_at, fact_hash, chunk_index, message_range";

/// Helper to convert tokio_rusqlite errors into EngramError::Storage.
fn storage_err(e: tokio_rusqlite::Error) -> EngramError {
    EngramError::Storage {
        source: Box::new(e),
    }
}

/// Helper to convert connection-open errors into EngramError::Storage.
fn open_err(e: rusqlite::Error) -> EngramError {
    EngramError::Storage {
        source: Box::new(e),
    }
}

fn json_err(e: serde_json::Error) -> EngramError {
    EngramError::Storage {
        source: Box::new(e),
    }
}

/// Persistent store for memory records in SQLite.
pub struct SqliteMemoryStore {
    conn: Connection,
}

impl SqliteMemoryStore {
    /// Wrap an existing connection. Migrations must already be applied.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open (or create) a database file, apply PRAGMAs, and run migrations.
    pub async fn open(path: &Path) -> Result<Self, EngramError> {
        let conn = Connection::open(path).await.map_err(open_err)?;
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        })
        .await
        .map_err(storage_err)?;
        Self::migrate(conn).await
    }

    /// Open an in-memory database and run migrations. Used in tests.
    pub async fn open_in_memory() -> Result<Self, EngramError> {
        let conn = Connection::open_in_memory().await.map_err(open_err)?;
        Self::migrate(conn).await
    }

    async fn migrate(conn: Connection) -> Result<Self, EngramError> {
        conn.call(run_migrations)
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(migration) => migration,
                other => EngramError::Storage {
                    source: Box::new(other),
                },
            })?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn insert(&self, record: MemoryRecord) -> Result<MemoryRecord, EngramError> {
        let user_ids_json = serde_json::to_string(&record.user_ids).map_err(json_err)?;
        let content_json = serde_json::to_string(&record.content).map_err(json_err)?;
        let keywords_json = serde_json::to_string(&record.keywords).map_err(json_err)?;
        let embedding_blob = record.embedding.as_deref().map(vec_to_blob);
        let room_id = record.context.as_ref().and_then(MemoryContext::room_id).map(str::to_string);
        let conversation_id = record.conversation_id().map(str::to_string);

        let id = record.id.clone();
        let owner_id = record.owner_id.clone();
        let layer = record.layer.as_str().to_string();
        let summary = record.summary.clone();
        let importance = record.importance;
        let access_count = record.access_count;
        let last_accessed = record.last_accessed.as_ref().map(format_timestamp);
        let created_at = format_timestamp(&record.created_at);
        let fact_hash = record.fact_hash.clone();
        let chunk_index = record.chunk_index;
        let message_range = record.message_range.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO memories (id, owner_id, user_ids, room_id, conversation_id, layer, summary, content, keywords, importance, embedding, access_count, last_accessed, created_at, fact_hash, chunk_index, message_range) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                    rusqlite::params![id, owner_id, user_ids_json, room_id, conversation_id, layer, summary, content_json, keywords_json, importance, embedding_blob, access_count, last_accessed, created_at, fact_hash, chunk_index, message_range],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| duplicate_or_storage(e, record.chunk_index, record.fact_hash.clone()))?;

        debug!(id = %record.id, layer = record.layer.as_str(), "inserted memory");
        Ok(record)
    }

    async fn update(&self, record: &MemoryRecord) -> Result<(), EngramError> {
        let id = record.id.clone();
        let access_count = record.access_count;
        let last_accessed = record.last_accessed.as_ref().map(format_timestamp);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE memories SET access_count = ?1, last_accessed = ?2 WHERE id = ?3",
                    rusqlite::params![access_count, last_accessed, id],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<MemoryRecord>, EngramError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {COLUMNS} FROM memories WHERE id = ?1");
                let mut stmt = conn.prepare(&sql)?;
                let record = stmt
                    .query_row(rusqlite::params![id], row_to_record)
                    .optional()?;
                Ok(record)
            })
            .await
            .map_err(storage_err)
    }

    async fn get_by_owner(
        &self,
        owner_id: &str,
        conversation_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, EngramError> {
        let owner_id = owner_id.to_string();
        let conversation_id = conversation_id.map(str::to_string);
        self.conn
            .call(move |conn| {
                let records = match conversation_id {
                    Some(conversation_id) => {
                        let sql = format!(
                            "SELECT {COLUMNS} FROM memories WHERE owner_id = ?1 AND conversation_id = ?2 ORDER BY importance DESC, created_at DESC LIMIT ?3"
                        );
                        let mut stmt = conn.prepare(&sql)?;
                        stmt.query_map(
                            rusqlite::params![owner_id, conversation_id, limit as i64],
                            row_to_record,
                        )?
                        .collect::<Result<Vec<_>, _>>()?
                    }
                    None => {
                        let sql = format!(
                            "SELECT {COLUMNS} FROM memories WHERE owner_id = ?1 ORDER BY importance DESC, created_at DESC LIMIT ?2"
                        );
                        let mut stmt = conn.prepare(&sql)?;
                        stmt.query_map(rusqlite::params![owner_id, limit as i64], row_to_record)?
                            .collect::<Result<Vec<_>, _>>()?
                    }
                };
                Ok(records)
            })
            .await
            .map_err(storage_err)
    }

    async fn search_by_keywords(
        &self,
        owner_id: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, EngramError> {
        if keywords.is_empty() {
            return Ok(vec![]);
        }

        let owner_id = owner_id.to_string();
        let keywords = keywords.to_vec();
        self.conn
            .call(move |conn| {
                // Keyword overlap via json_each over the stored keyword array.
                let placeholders: Vec<String> =
                    (2..=keywords.len() + 1).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "SELECT {COLUMNS} FROM memories WHERE owner_id = ?1 AND EXISTS (SELECT 1 FROM json_each(memories.keywords) WHERE json_each.value IN ({})) ORDER BY importance DESC, created_at DESC LIMIT {}",
                    placeholders.join(", "),
                    limit as i64,
                );
                let mut stmt = conn.prepare(&sql)?;

                let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&owner_id];
                for keyword in &keywords {
                    params.push(keyword as &dyn rusqlite::types::ToSql);
                }
                let records = stmt
                    .query_map(params.as_slice(), row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(storage_err)
    }

    async fn vector_search(
        &self,
        owner_id: &str,
        embedding: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, EngramError> {
        let owner_id = owner_id.to_string();
        let layer = filters.layer.map(|l| l.as_str().to_string());

        let candidates = self
            .conn
            .call(move |conn| {
                let records = match layer {
                    Some(layer) => {
                        let sql = format!(
                            "SELECT {COLUMNS} FROM memories WHERE owner_id = ?1 AND layer = ?2 AND embedding IS NOT NULL"
                        );
                        let mut stmt = conn.prepare(&sql)?;
                        stmt.query_map(rusqlite::params![owner_id, layer], row_to_record)?
                            .collect::<Result<Vec<_>, _>>()?
                    }
                    None => {
                        let sql = format!(
                            "SELECT {COLUMNS} FROM memories WHERE owner_id = ?1 AND embedding IS NOT NULL"
                        );
                        let mut stmt = conn.prepare(&sql)?;
                        stmt.query_map(rusqlite::params![owner_id], row_to_record)?
                            .collect::<Result<Vec<_>, _>>()?
                    }
                };
                Ok(records)
            })
            .await
            .map_err(storage_err)?;

        // Rank by cosine similarity in-process; remaining filters are shared
        // with the keyword path via SearchFilters::matches.
        let mut scored: Vec<(f64, MemoryRecord)> = candidates
            .into_iter()
            .filter(|record| filters.matches(record))
            .filter_map(|record| {
                let stored = record.embedding.as_deref()?;
                let similarity = cosine_similarity(embedding, stored);
                Some((similarity, record))
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, record)| record).collect())
    }

    async fn delete_older_than(&self, ttl_days: u32) -> Result<u64, EngramError> {
        let modifier = format!("-{ttl_days} days");
        let deleted = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "DELETE FROM memories WHERE layer = 'short_term' AND created_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)",
                    rusqlite::params![modifier],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(storage_err)?;

        if deleted > 0 {
            debug!(deleted, ttl_days, "swept expired short-term memories");
        }
        Ok(deleted)
    }

    async fn find_fact(
        &self,
        owner_id: &str,
        conversation_id: &str,
        chunk_index: i64,
        fact_hash: &str,
    ) -> Result<Option<MemoryRecord>, EngramError> {
        let owner_id = owner_id.to_string();
        let conversation_id = conversation_id.to_string();
        let fact_hash = fact_hash.to_string();
        self.conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {COLUMNS} FROM memories WHERE owner_id = ?1 AND conversation_id = ?2 AND chunk_index = ?3 AND fact_hash = ?4"
                );
                let mut stmt = conn.prepare(&sql)?;
                let record = stmt
                    .query_row(
                        rusqlite::params![owner_id, conversation_id, chunk_index, fact_hash],
                        row_to_record,
                    )
                    .optional()?;
                Ok(record)
            })
            .await
            .map_err(storage_err)
    }

    async fn get_short_term_chunks(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<MemoryRecord>, EngramError> {
        let owner_id = owner_id.to_string();
        let conversation_id = conversation_id.to_string();
        self.conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {COLUMNS} FROM memories WHERE owner_id = ?1 AND conversation_id = ?2 AND layer = 'short_term' ORDER BY chunk_index ASC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map(rusqlite::params![owner_id, conversation_id], row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(storage_err)
    }

    async fn delete_short_term_chunks(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<u64, EngramError> {
        let owner_id = owner_id.to_string();
        let conversation_id = conversation_id.to_string();
        self.conn
            .call(move |conn| {
                let count = conn.execute(
                    "DELETE FROM memories WHERE owner_id = ?1 AND conversation_id = ?2 AND layer = 'short_term'",
                    rusqlite::params![owner_id, conversation_id],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(storage_err)
    }
}

/// Map a unique-index violation on a fact insert to the duplicate signal.
fn duplicate_or_storage(
    e: tokio_rusqlite::Error,
    chunk_index: Option<i64>,
    fact_hash: Option<String>,
) -> EngramError {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, _)) = &e
        && failure.code == rusqlite::ErrorCode::ConstraintViolation
        && let (Some(chunk_index), Some(fact_hash)) = (chunk_index, fact_hash)
    {
        return EngramError::DuplicateFact {
            chunk_index,
            fact_hash,
        };
    }
    storage_err(e)
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a rusqlite Row to a MemoryRecord.
fn row_to_record(row: &rusqlite::Row) -> Result<MemoryRecord, rusqlite::Error> {
    let user_ids_json: String = row.get(2)?;
    let room_id: Option<String> = row.get(3)?;
    let conversation_id: Option<String> = row.get(4)?;
    let layer_str: String = row.get(5)?;
    let content_json: String = row.get(7)?;
    let keywords_json: String = row.get(8)?;
    let embedding_blob: Option<Vec<u8>> = row.get(10)?;
    let last_accessed: Option<String> = row.get(12)?;
    let created_at: String = row.get(13)?;

    let content: MemoryContent = serde_json::from_str(&content_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let context = match conversation_id {
        Some(id) => Some(MemoryContext::Conversation(id)),
        None => room_id.map(MemoryContext::Room),
    };

    Ok(MemoryRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        user_ids: serde_json::from_str(&user_ids_json).unwrap_or_default(),
        context,
        layer: MemoryLayer::from_str_value(&layer_str),
        summary: row.get(6)?,
        content,
        keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
        importance: row.get(9)?,
        embedding: embedding_blob.map(|b| blob_to_vec(&b)),
        access_count: row.get(11)?,
        last_accessed: last_accessed.as_deref().and_then(parse_timestamp),
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
        fact_hash: row.get(14)?,
        chunk_index: row.get(15)?,
        message_range: row.get(16)?,
    })
}

/// Extension trait for optional row queries.
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
