// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-layer hybrid retrieval: dense vector search plus sparse keyword
//! search, fused with Reciprocal Rank Fusion.
//!
//! The two searches run concurrently. An embedding failure degrades the
//! vector side to an empty list rather than failing the search; store
//! errors propagate.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use engram_config::EngramConfig;
use engram_core::{
    EmbeddingAdapter, EngramError, KeywordExtractor, MemoryRecord, MemoryStore, SearchFilters,
};

/// RRF rank constant. Standard value from the literature; dampens the gap
/// between neighboring ranks.
pub(crate) const RRF_K: f64 = 60.0;

/// Hybrid vector + keyword retriever for a single memory layer.
pub struct HybridRetriever {
    store: Arc<dyn MemoryStore>,
    embedder: Arc<dyn EmbeddingAdapter>,
    keywords: Arc<dyn KeywordExtractor>,
    vector_weight: f64,
    keyword_weight: f64,
    max_keywords: usize,
}

impl HybridRetriever {
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
            vector_weight: config.retrieval.vector_weight,
            keyword_weight: config.retrieval.keyword_weight,
            max_keywords: config.memory.max_keywords,
        }
    }

    /// Search one layer (selected via `filters.layer`) for `query`.
    ///
    /// Results are ranked by fused RRF score, truncated to `limit`.
    pub async fn search(
        &self,
        owner_id: &str,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, EngramError> {
        let query_keywords = match self.keywords.extract(query, self.max_keywords).await {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!(error = %e, "query keyword extraction failed, vector-only search");
                Vec::new()
            }
        };

        let vector_fut = async {
            match self.embedder.embed(query).await {
                Ok(embedding) => {
                    self.store
                        .vector_search(owner_id, &embedding, filters, limit)
                        .await
                }
                Err(e) => {
                    warn!(error = %e, "query embedding failed, keyword-only search");
                    Ok(Vec::new())
                }
            }
        };

        let keyword_fut = async {
            if query_keywords.is_empty() {
                return Ok(Vec::new());
            }
            let candidates = self
                .store
                .search_by_keywords(owner_id, &query_keywords, limit)
                .await?;
            // Keyword search only scopes by owner; re-apply the layer and
            // context filters so both paths see the same candidate universe.
            Ok(candidates
                .into_iter()
                .filter(|record| filters.matches(record))
                .collect::<Vec<_>>())
        };

        let (vector_results, keyword_results) = tokio::join!(vector_fut, keyword_fut);

        let mut fused = rrf_fusion(vec![
            (vector_results?, self.vector_weight),
            (keyword_results?, self.keyword_weight),
        ]);
        fused.truncate(limit);
        Ok(fused)
    }
}

/// Fuse ranked lists with Reciprocal Rank Fusion.
///
/// Each item at zero-based rank `r` in a list contributes
/// `weight / (k + r)` to its total; items in several lists accumulate.
/// Ties break on id for determinism.
pub(crate) fn rrf_fusion(lists: Vec<(Vec<MemoryRecord>, f64)>) -> Vec<MemoryRecord> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    let mut records: HashMap<String, MemoryRecord> = HashMap::new();

    for (list, weight) in lists {
        for (rank, record) in list.into_iter().enumerate() {
            *scores.entry(record.id.clone()).or_insert(0.0) += weight / (RRF_K + rank as f64);
            records.entry(record.id.clone()).or_insert(record);
        }
    }

    let mut fused: Vec<(f64, MemoryRecord)> = records
        .into_iter()
        .map(|(id, record)| (scores[&id], record))
        .collect();
    fused.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });
    fused.into_iter().map(|(_, record)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engram_core::{MemoryContent, MemoryContext, MemoryLayer};
    use engram_storage::SqliteMemoryStore;
    use engram_test_utils::{seeded_vector, MockEmbedder, MockKeywordExtractor};

    fn make_record(id: &str, keywords: Vec<&str>, embedding_seed: &str) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            owner_id: "ai-1".into(),
            user_ids: vec!["u-1".into()],
            context: Some(MemoryContext::Conversation("c-1".into())),
            layer: MemoryLayer::LongTerm,
            summary: id.to_string(),
            content: MemoryContent::Fact {
                fact: engram_core::Fact {
                    text: id.to_string(),
                    importance: 0.5,
                    participants: vec![],
                    theme: "Test".into(),
                },
            },
            keywords: keywords.into_iter().map(str::to_string).collect(),
            importance: 0.5,
            embedding: Some(seeded_vector(embedding_seed)),
            access_count: 0,
            last_accessed: None,
            created_at: Utc::now(),
            fact_hash: None,
            chunk_index: None,
            message_range: None,
        }
    }

    #[test]
    fn rrf_item_in_both_lists_beats_single_list_items() {
        let shared = make_record("shared", vec![], "s");
        let vector_only = make_record("vector-only", vec![], "v");
        let keyword_only = make_record("keyword-only", vec![], "k");

        // "shared" is ranked first in both lists.
        let fused = rrf_fusion(vec![
            (vec![shared.clone(), vector_only.clone()], 0.7),
            (vec![shared, keyword_only], 0.3),
        ]);

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].id, "shared");
    }

    #[test]
    fn rrf_respects_weights() {
        let a = make_record("a", vec![], "a");
        let b = make_record("b", vec![], "b");

        // a first in the heavy list, b first in the light list.
        let fused = rrf_fusion(vec![
            (vec![a.clone(), b.clone()], 0.7),
            (vec![b, a], 0.3),
        ]);
        assert_eq!(fused[0].id, "a");
    }

    #[test]
    fn rrf_empty_lists() {
        assert!(rrf_fusion(vec![(vec![], 0.7), (vec![], 0.3)]).is_empty());
    }

    #[tokio::test]
    async fn search_combines_vector_and_keyword_paths() {
        let store: Arc<dyn MemoryStore> =
            Arc::new(SqliteMemoryStore::open_in_memory().await.unwrap());

        // Found via keywords, not embedding similarity.
        let keyword_hit = make_record("keyword-hit", vec!["python", "bob"], "unrelated text");
        // Found via embedding similarity (same seed text as the query).
        let vector_hit = make_record("vector-hit", vec!["other"], "bob python");
        store.insert(keyword_hit).await.unwrap();
        store.insert(vector_hit).await.unwrap();

        let retriever = HybridRetriever::new(
            Arc::clone(&store),
            Arc::new(MockEmbedder::new()),
            Arc::new(MockKeywordExtractor),
            &EngramConfig::default(),
        );

        let filters = SearchFilters {
            layer: Some(MemoryLayer::LongTerm),
            ..Default::default()
        };
        let results = retriever
            .search("ai-1", "bob python", &filters, 5)
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&"keyword-hit"));
        assert!(ids.contains(&"vector-hit"));
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_keyword_only() {
        let store: Arc<dyn MemoryStore> =
            Arc::new(SqliteMemoryStore::open_in_memory().await.unwrap());
        store
            .insert(make_record("keyword-hit", vec!["python"], "x"))
            .await
            .unwrap();

        let retriever = HybridRetriever::new(
            Arc::clone(&store),
            Arc::new(MockEmbedder::failing()),
            Arc::new(MockKeywordExtractor),
            &EngramConfig::default(),
        );

        let results = retriever
            .search("ai-1", "python", &SearchFilters::default(), 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "keyword-hit");
    }

    #[tokio::test]
    async fn keyword_results_respect_filters() {
        let store: Arc<dyn MemoryStore> =
            Arc::new(SqliteMemoryStore::open_in_memory().await.unwrap());
        let mut excluded = make_record("excluded", vec!["python"], "a");
        excluded.context = Some(MemoryContext::Conversation("c-current".into()));
        let mut included = make_record("included", vec!["python"], "b");
        included.context = Some(MemoryContext::Conversation("c-old".into()));
        store.insert(excluded).await.unwrap();
        store.insert(included).await.unwrap();

        let retriever = HybridRetriever::new(
            Arc::clone(&store),
            Arc::new(MockEmbedder::failing()), // force keyword-only
            Arc::new(MockKeywordExtractor),
            &EngramConfig::default(),
        );

        let filters = SearchFilters {
            exclude_conversation_id: Some("c-current".into()),
            ..Default::default()
        };
        let results = retriever.search("ai-1", "python", &filters, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "included");
    }
}
