// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Personality document uploads.
//!
//! Splits a document into overlapping chunks, embeds them all in one batch
//! call, and persists one global record per chunk. Unlike fact extraction,
//! the batch embed is fail-fast: if it errors, nothing is persisted.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use engram_config::EngramConfig;
use engram_core::types::truncate_summary;
use engram_core::{
    EmbeddingAdapter, EmbeddingInput, EngramError, KeywordExtractor, MemoryContent, MemoryLayer,
    MemoryRecord, MemoryStore,
};

use crate::splitter::split_text;

/// Character budget for a personality chunk summary.
const SUMMARY_LEN: usize = 200;

/// Uploads personality documents as global memory records.
pub struct PersonalityUploader {
    store: Arc<dyn MemoryStore>,
    embedder: Arc<dyn EmbeddingAdapter>,
    keywords: Arc<dyn KeywordExtractor>,
    chunk_size: usize,
    chunk_overlap: usize,
    max_keywords: usize,
}

impl PersonalityUploader {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embedder: Arc<dyn EmbeddingAdapter>,
        keywords: Arc<dyn KeywordExtractor>,
        config: &EngramConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            keywords,
            chunk_size: config.chunking.personality_chunk_size,
            chunk_overlap: config.chunking.personality_chunk_overlap,
            max_keywords: config.memory.max_keywords,
        }
    }

    /// Upload a document for `owner_id` under `category`.
    ///
    /// `extra` is merged into each chunk's metadata alongside the generated
    /// `category`/`chunk_index`/`total_chunks` keys. Blank input returns
    /// empty without touching the store or the embedder. An embedding batch
    /// failure aborts the whole upload with nothing persisted.
    pub async fn upload(
        &self,
        owner_id: &str,
        text: &str,
        category: &str,
        extra: serde_json::Value,
    ) -> Result<Vec<MemoryRecord>, EngramError> {
        let chunks = split_text(text, self.chunk_size, self.chunk_overlap);
        if chunks.is_empty() {
            debug!(owner_id, category, "blank personality upload, nothing to do");
            return Ok(Vec::new());
        }
        let total_chunks = chunks.len();

        // One batch call for every chunk; fail-fast before any insert.
        let output = self
            .embedder
            .embed_batch(EmbeddingInput {
                texts: chunks.clone(),
            })
            .await?;
        if output.embeddings.len() != total_chunks {
            return Err(EngramError::Embedding {
                message: format!(
                    "batch embed returned {} vectors for {} chunks",
                    output.embeddings.len(),
                    total_chunks
                ),
                source: None,
            });
        }

        let mut records = Vec::with_capacity(total_chunks);
        for (index, (chunk, embedding)) in
            chunks.into_iter().zip(output.embeddings).enumerate()
        {
            let keywords = match self.keywords.extract(&chunk, self.max_keywords).await {
                Ok(keywords) => keywords,
                Err(e) => {
                    warn!(error = %e, index, "keyword extraction failed for personality chunk");
                    Vec::new()
                }
            };

            let mut metadata = json!({
                "category": category,
                "chunk_index": index,
                "total_chunks": total_chunks,
            });
            if let (Some(target), Some(source)) = (metadata.as_object_mut(), extra.as_object()) {
                for (key, value) in source {
                    target.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }

            let summary = truncate_summary(&chunk, SUMMARY_LEN);
            let record = MemoryRecord {
                id: Uuid::new_v4().to_string(),
                owner_id: owner_id.to_string(),
                user_ids: Vec::new(),
                context: None,
                layer: MemoryLayer::Personality,
                summary,
                content: MemoryContent::Text {
                    text: chunk,
                    metadata,
                },
                keywords,
                importance: 1.0,
                embedding: Some(embedding),
                access_count: 0,
                last_accessed: None,
                created_at: Utc::now(),
                fact_hash: None,
                chunk_index: Some(index as i64),
                message_range: None,
            };
            records.push(self.store.insert(record).await?);
        }

        debug!(owner_id, category, total_chunks, "personality upload complete");
        metrics::counter!("engram_personality_chunks_total").increment(total_chunks as u64);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_storage::SqliteMemoryStore;
    use engram_test_utils::{MockEmbedder, MockKeywordExtractor};

    async fn make_uploader(embedder: MockEmbedder) -> (PersonalityUploader, Arc<dyn MemoryStore>) {
        let store: Arc<dyn MemoryStore> =
            Arc::new(SqliteMemoryStore::open_in_memory().await.unwrap());
        let uploader = PersonalityUploader::new(
            Arc::clone(&store),
            Arc::new(embedder),
            Arc::new(MockKeywordExtractor),
            &EngramConfig::default(),
        );
        (uploader, store)
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let embedder = MockEmbedder::failing(); // would error if called
        let (uploader, store) = make_uploader(embedder).await;

        let records = uploader
            .upload("ai-1", "   \n  ", "lore", serde_json::Value::Null)
            .await
            .unwrap();
        assert!(records.is_empty());
        assert!(store.get_by_owner("ai-1", None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_persists_global_records_with_metadata() {
        let (uploader, _store) = make_uploader(MockEmbedder::new()).await;

        let text = format!("{}\n\n{}", "a".repeat(400), "b".repeat(400));
        let records = uploader
            .upload("ai-1", &text, "backstory", json!({"source": "docs/lore.md"}))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.layer, MemoryLayer::Personality);
            assert!(record.user_ids.is_empty());
            assert!(record.context.is_none());
            assert_eq!(record.importance, 1.0);
            assert!(record.embedding.is_some());
            assert_eq!(record.chunk_index, Some(i as i64));
            match &record.content {
                MemoryContent::Text { metadata, .. } => {
                    assert_eq!(metadata["category"], "backstory");
                    assert_eq!(metadata["chunk_index"], i);
                    assert_eq!(metadata["total_chunks"], 2);
                    assert_eq!(metadata["source"], "docs/lore.md");
                }
                other => panic!("expected text content, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn embeddings_linked_by_index() {
        let (uploader, _store) = make_uploader(MockEmbedder::new()).await;

        let text = format!("{}\n\n{}", "x".repeat(300), "y".repeat(300));
        let records = uploader
            .upload("ai-1", &text, "lore", serde_json::Value::Null)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        for record in &records {
            let text = match &record.content {
                MemoryContent::Text { text, .. } => text.clone(),
                other => panic!("expected text content, got {other:?}"),
            };
            assert_eq!(
                record.embedding.as_deref(),
                Some(engram_test_utils::seeded_vector(&text).as_slice())
            );
        }
    }

    #[tokio::test]
    async fn batch_embed_failure_persists_nothing() {
        let (uploader, store) = make_uploader(MockEmbedder::failing()).await;

        let text = "Some personality lore that is long enough to matter.";
        let err = uploader
            .upload("ai-1", text, "lore", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, EngramError::Embedding { .. }));
        assert!(store.get_by_owner("ai-1", None, 10).await.unwrap().is_empty());
    }
}
