// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory store trait: the persistence seam consumed by the engine.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::types::{MemoryRecord, SearchFilters};

/// Persistence abstraction over memory records.
///
/// Implementations must enforce a uniqueness constraint on
/// `(owner_id, conversation_id, chunk_index, fact_hash)` and surface
/// violations as [`EngramError::DuplicateFact`]; the fact extractor relies
/// on this for idempotence under concurrent retries.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Insert a new record and return it.
    async fn insert(&self, record: MemoryRecord) -> Result<MemoryRecord, EngramError>;

    /// Persist the mutable access-tracking fields (`access_count`,
    /// `last_accessed`) of an existing record.
    async fn update(&self, record: &MemoryRecord) -> Result<(), EngramError>;

    /// Point lookup by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<MemoryRecord>, EngramError>;

    /// Recent records for an owner, optionally scoped to one conversation,
    /// ordered by importance then recency.
    async fn get_by_owner(
        &self,
        owner_id: &str,
        conversation_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, EngramError>;

    /// Keyword-overlap candidate search, ordered by importance then recency.
    async fn search_by_keywords(
        &self,
        owner_id: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, EngramError>;

    /// Vector search by ascending cosine distance, applying `filters` in-query.
    async fn vector_search(
        &self,
        owner_id: &str,
        embedding: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, EngramError>;

    /// Delete short-term records older than `ttl_days`; returns the count.
    async fn delete_older_than(&self, ttl_days: u32) -> Result<u64, EngramError>;

    /// Look up a long-term fact by its idempotence key.
    async fn find_fact(
        &self,
        owner_id: &str,
        conversation_id: &str,
        chunk_index: i64,
        fact_hash: &str,
    ) -> Result<Option<MemoryRecord>, EngramError>;

    /// All short-term chunks of a conversation, ordered by `chunk_index`.
    async fn get_short_term_chunks(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<MemoryRecord>, EngramError>;

    /// Delete all short-term chunks of a conversation; returns the count.
    async fn delete_short_term_chunks(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<u64, EngramError>;
}
