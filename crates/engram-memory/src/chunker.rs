// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-term memory chunker.
//!
//! Slices live conversations into fixed-size message chunks and persists
//! each completed chunk verbatim. Chunks carry no embedding; they are found
//! by keyword overlap and recency, and consumed later by the fact extractor.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use engram_config::EngramConfig;
use engram_core::{
    EngramError, KeywordExtractor, MemoryContent, MemoryContext, MemoryLayer, MemoryRecord,
    MemoryStore, StoredMessage,
};

/// Character budget for a chunk summary (the first message, truncated).
const SUMMARY_LEN: usize = 200;

/// Creates short-term chunk records from conversation message slices.
pub struct ShortTermChunker {
    store: Arc<dyn MemoryStore>,
    keywords: Arc<dyn KeywordExtractor>,
    chunk_size: usize,
    max_keywords: usize,
}

impl ShortTermChunker {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        keywords: Arc<dyn KeywordExtractor>,
        config: &EngramConfig,
    ) -> Self {
        Self {
            store,
            keywords,
            chunk_size: config.chunking.short_term_chunk_size,
            max_keywords: config.memory.max_keywords,
        }
    }

    /// The chunk index to create now, if any.
    ///
    /// Only complete chunks are ever created: with `chunk_size` messages per
    /// chunk, a conversation of `total_messages` messages has
    /// `total_messages / chunk_size` complete chunks. Returns
    /// `Some(existing_chunks)` when one more is due, at most one per call.
    pub fn next_chunk_index(&self, total_messages: usize, existing_chunks: usize) -> Option<usize> {
        let expected_complete = total_messages / self.chunk_size;
        (expected_complete > existing_chunks).then_some(existing_chunks)
    }

    /// Message index bounds `[start, end)` of the given chunk.
    pub fn chunk_bounds(&self, chunk_index: usize) -> (usize, usize) {
        let start = chunk_index * self.chunk_size;
        (start, start + self.chunk_size)
    }

    /// Persist one completed chunk of a conversation.
    ///
    /// `messages` is the slice for this chunk; `start`/`end` are its message
    /// index bounds within the conversation, recorded as provenance.
    pub async fn create_chunk(
        &self,
        owner_id: &str,
        user_ids: Vec<String>,
        conversation_id: &str,
        messages: &[StoredMessage],
        chunk_index: i64,
        start: usize,
        end: usize,
    ) -> Result<MemoryRecord, EngramError> {
        let combined: String = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let keywords = match self.keywords.extract(&combined, self.max_keywords).await {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!(error = %e, conversation_id, chunk_index, "keyword extraction failed, storing chunk without keywords");
                Vec::new()
            }
        };

        let summary = messages
            .first()
            .map(|m| engram_core::types::truncate_summary(&m.content, SUMMARY_LEN))
            .unwrap_or_default();

        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            user_ids,
            context: Some(MemoryContext::Conversation(conversation_id.to_string())),
            layer: MemoryLayer::ShortTerm,
            summary,
            content: MemoryContent::Messages {
                messages: messages.to_vec(),
                message_count: messages.len(),
            },
            keywords,
            importance: 1.0,
            embedding: None,
            access_count: 0,
            last_accessed: None,
            created_at: Utc::now(),
            fact_hash: None,
            chunk_index: Some(chunk_index),
            message_range: Some(format!("{start}-{end}")),
        };

        let record = self.store.insert(record).await?;
        debug!(
            conversation_id,
            chunk_index,
            message_count = messages.len(),
            "created short-term chunk"
        );
        metrics::counter!("engram_chunks_created_total").increment(1);
        Ok(record)
    }
}
