// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-layer fusion: combine short-term, long-term, and personality
//! search results into one bounded memory context.
//!
//! Each layer first receives its guaranteed minimum slots; the remaining
//! budget is filled by weighted RRF over the pooled leftovers. A failed
//! layer contributes an empty list; retrieval only errors when every layer
//! fails.

use std::sync::Arc;

use tracing::warn;

use engram_config::{EngramConfig, RetrievalConfig};
use engram_core::{EngramError, MemoryLayer, MemoryRecord, SearchFilters};

use crate::retriever::{HybridRetriever, RRF_K};
use crate::tracker::AccessTracker;

/// Ranked output of one layer search, paired with its fusion parameters.
struct LayerResults {
    layer: MemoryLayer,
    records: Vec<MemoryRecord>,
    guaranteed: usize,
    weight: f64,
}

/// Tiered retrieval across all three memory layers.
pub struct FusionEngine {
    retriever: Arc<HybridRetriever>,
    tracker: AccessTracker,
    config: RetrievalConfig,
}

impl FusionEngine {
    pub fn new(
        retriever: Arc<HybridRetriever>,
        tracker: AccessTracker,
        config: &EngramConfig,
    ) -> Self {
        Self {
            retriever,
            tracker,
            config: config.retrieval.clone(),
        }
    }

    /// Retrieve a fused memory context for a query.
    ///
    /// Short-term is scoped to the current conversation, long-term to the
    /// user excluding the current conversation, personality is global.
    /// Surfaced records have their access stats bumped in the background.
    pub async fn retrieve_tiered(
        &self,
        owner_id: &str,
        user_id: &str,
        conversation_id: &str,
        query: &str,
    ) -> Result<Vec<MemoryRecord>, EngramError> {
        let short_filters = SearchFilters {
            conversation_id: Some(conversation_id.to_string()),
            layer: Some(MemoryLayer::ShortTerm),
            ..Default::default()
        };
        let long_filters = SearchFilters {
            user_id: Some(user_id.to_string()),
            exclude_conversation_id: Some(conversation_id.to_string()),
            layer: Some(MemoryLayer::LongTerm),
            ..Default::default()
        };
        let personality_filters = SearchFilters {
            layer: Some(MemoryLayer::Personality),
            ..Default::default()
        };

        let (short, long, personality) = tokio::join!(
            self.retriever
                .search(owner_id, query, &short_filters, self.config.short_term_candidates),
            self.retriever
                .search(owner_id, query, &long_filters, self.config.long_term_candidates),
            self.retriever.search(
                owner_id,
                query,
                &personality_filters,
                self.config.personality_candidates
            ),
        );

        let mut failures = 0;
        let mut unwrap_layer = |layer: MemoryLayer, result: Result<Vec<MemoryRecord>, EngramError>| {
            match result {
                Ok(records) => records,
                Err(e) => {
                    warn!(layer = layer.as_str(), error = %e, "layer search failed, contributing nothing");
                    metrics::counter!("engram_layer_search_failures_total").increment(1);
                    failures += 1;
                    Vec::new()
                }
            }
        };
        let short = unwrap_layer(MemoryLayer::ShortTerm, short);
        let long = unwrap_layer(MemoryLayer::LongTerm, long);
        let personality = unwrap_layer(MemoryLayer::Personality, personality);

        if failures == 3 {
            return Err(EngramError::Retrieval(
                "all memory layers failed to search".into(),
            ));
        }

        let layers = vec![
            LayerResults {
                layer: MemoryLayer::ShortTerm,
                records: short,
                guaranteed: self.config.guaranteed_short_term,
                weight: self.config.short_term_layer_weight,
            },
            LayerResults {
                layer: MemoryLayer::LongTerm,
                records: long,
                guaranteed: self.config.guaranteed_long_term,
                weight: self.config.long_term_layer_weight,
            },
            LayerResults {
                layer: MemoryLayer::Personality,
                records: personality,
                guaranteed: self.config.guaranteed_personality,
                weight: self.config.personality_layer_weight,
            },
        ];

        let fused = fuse_layers(layers, self.config.total_limit);
        metrics::counter!("engram_tiered_retrievals_total").increment(1);

        // Fire-and-forget access tracking; the caller gets results now.
        if !fused.is_empty() {
            let tracker = self.tracker.clone();
            let surfaced = fused.clone();
            tokio::spawn(async move {
                tracker.record_access(&surfaced).await;
            });
        }

        Ok(fused)
    }
}

/// Peel guaranteed minimums, then fill the remaining budget by weighted RRF
/// over the pooled leftovers.
///
/// Pool scores use each record's zero-based rank in its own layer's ranked
/// list. Equal scores break on layer priority (short-term, long-term,
/// personality), then descending importance, then id.
fn fuse_layers(layers: Vec<LayerResults>, total_limit: usize) -> Vec<MemoryRecord> {
    let mut guaranteed = Vec::new();
    let mut pool: Vec<(f64, MemoryLayer, MemoryRecord)> = Vec::new();

    for layer_results in layers {
        let LayerResults {
            layer,
            records,
            guaranteed: take,
            weight,
        } = layer_results;
        for (rank, record) in records.into_iter().enumerate() {
            if rank < take {
                guaranteed.push(record);
            } else {
                let score = weight / (RRF_K + rank as f64);
                pool.push((score, layer, record));
            }
        }
    }

    if guaranteed.len() >= total_limit {
        guaranteed.truncate(total_limit);
        return guaranteed;
    }

    pool.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| layer_priority(a.1).cmp(&layer_priority(b.1)))
            .then_with(|| {
                b.2.importance
                    .partial_cmp(&a.2.importance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.2.id.cmp(&b.2.id))
    });

    let remaining = total_limit - guaranteed.len();
    guaranteed.extend(pool.into_iter().take(remaining).map(|(_, _, record)| record));
    guaranteed
}

fn layer_priority(layer: MemoryLayer) -> u8 {
    match layer {
        MemoryLayer::ShortTerm => 0,
        MemoryLayer::LongTerm => 1,
        MemoryLayer::Personality => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engram_core::{MemoryContent, MemoryContext, MemoryStore};
    use engram_storage::SqliteMemoryStore;
    use engram_test_utils::{MockEmbedder, MockKeywordExtractor};

    fn make_record(id: &str, layer: MemoryLayer, importance: f64) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            owner_id: "ai-1".into(),
            user_ids: vec!["u-1".into()],
            context: match layer {
                MemoryLayer::Personality => None,
                _ => Some(MemoryContext::Conversation("c-1".into())),
            },
            layer,
            summary: id.to_string(),
            content: MemoryContent::Text {
                text: id.to_string(),
                metadata: serde_json::Value::Null,
            },
            keywords: vec![],
            importance,
            embedding: None,
            access_count: 0,
            last_accessed: None,
            created_at: Utc::now(),
            fact_hash: None,
            chunk_index: None,
            message_range: None,
        }
    }

    fn layer_results(
        layer: MemoryLayer,
        ids: &[&str],
        guaranteed: usize,
        weight: f64,
    ) -> LayerResults {
        LayerResults {
            layer,
            records: ids.iter().map(|id| make_record(id, layer, 0.5)).collect(),
            guaranteed,
            weight,
        }
    }

    #[test]
    fn guaranteed_minimums_are_honored() {
        let layers = vec![
            layer_results(MemoryLayer::ShortTerm, &["st-0", "st-1"], 1, 2.0),
            layer_results(MemoryLayer::LongTerm, &["lt-0", "lt-1"], 1, 1.0),
            layer_results(MemoryLayer::Personality, &["p-0"], 0, 1.0),
        ];
        let fused = fuse_layers(layers, 4);

        assert_eq!(fused.len(), 4);
        // Guaranteed items come first, in layer extraction order.
        assert_eq!(fused[0].id, "st-0");
        assert_eq!(fused[1].id, "lt-0");
        let ids: Vec<&str> = fused.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&"st-0"));
        assert!(ids.contains(&"lt-0"));
    }

    #[test]
    fn guaranteed_overflow_truncates_to_budget() {
        let layers = vec![
            layer_results(MemoryLayer::ShortTerm, &["st-0", "st-1"], 2, 2.0),
            layer_results(MemoryLayer::LongTerm, &["lt-0", "lt-1"], 2, 1.0),
            layer_results(MemoryLayer::Personality, &["p-0"], 1, 1.0),
        ];
        let fused = fuse_layers(layers, 3);
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].id, "st-0");
        assert_eq!(fused[1].id, "st-1");
        assert_eq!(fused[2].id, "lt-0");
    }

    #[test]
    fn pool_fill_uses_layer_weights_and_original_rank() {
        // No guaranteed slots; pure weighted pool fill.
        let layers = vec![
            layer_results(MemoryLayer::ShortTerm, &["st-0"], 0, 2.0),
            layer_results(MemoryLayer::LongTerm, &["lt-0"], 0, 1.0),
            layer_results(MemoryLayer::Personality, &["p-0"], 0, 1.0),
        ];
        let fused = fuse_layers(layers, 2);

        assert_eq!(fused.len(), 2);
        // Short-term wins on weight 2.0 / (60 + 0).
        assert_eq!(fused[0].id, "st-0");
        // lt-0 and p-0 tie on score; layer priority puts long-term first.
        assert_eq!(fused[1].id, "lt-0");
    }

    #[test]
    fn tie_break_prefers_higher_importance() {
        let mut low = make_record("lt-low", MemoryLayer::LongTerm, 0.2);
        let mut high = make_record("lt-high", MemoryLayer::LongTerm, 0.9);
        low.id = "a-first-by-id".into(); // id order must not win over importance
        high.id = "z-last-by-id".into();

        let layers = vec![
            LayerResults {
                layer: MemoryLayer::LongTerm,
                records: vec![low],
                guaranteed: 0,
                weight: 1.0,
            },
            LayerResults {
                layer: MemoryLayer::LongTerm,
                records: vec![high],
                guaranteed: 0,
                weight: 1.0,
            },
        ];
        let fused = fuse_layers(layers, 1);
        assert_eq!(fused[0].id, "z-last-by-id");
    }

    #[test]
    fn empty_layers_yield_empty_result() {
        let layers = vec![
            layer_results(MemoryLayer::ShortTerm, &[], 1, 2.0),
            layer_results(MemoryLayer::LongTerm, &[], 1, 1.0),
            layer_results(MemoryLayer::Personality, &[], 0, 1.0),
        ];
        assert!(fuse_layers(layers, 7).is_empty());
    }

    #[tokio::test]
    async fn tiered_retrieval_end_to_end() {
        let store: Arc<dyn MemoryStore> =
            Arc::new(SqliteMemoryStore::open_in_memory().await.unwrap());

        // One record per layer, all keyword-matching the query.
        let mut short = make_record("st-0", MemoryLayer::ShortTerm, 1.0);
        short.keywords = vec!["python".into()];
        short.context = Some(MemoryContext::Conversation("c-now".into()));
        let mut long = make_record("lt-0", MemoryLayer::LongTerm, 0.8);
        long.keywords = vec!["python".into()];
        long.context = Some(MemoryContext::Conversation("c-old".into()));
        long.embedding = Some(vec![1.0, 0.0]);
        let mut personality = make_record("p-0", MemoryLayer::Personality, 1.0);
        personality.keywords = vec!["python".into()];
        personality.user_ids = vec![];
        personality.embedding = Some(vec![0.0, 1.0]);
        store.insert(short).await.unwrap();
        store.insert(long).await.unwrap();
        store.insert(personality).await.unwrap();

        let config = EngramConfig::default();
        let retriever = Arc::new(HybridRetriever::new(
            Arc::clone(&store),
            Arc::new(MockEmbedder::new()),
            Arc::new(MockKeywordExtractor),
            &config,
        ));
        let engine = FusionEngine::new(
            retriever,
            AccessTracker::new(Arc::clone(&store)),
            &config,
        );

        let results = engine
            .retrieve_tiered("ai-1", "u-1", "c-now", "python")
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&"st-0"), "short-term scoped to current conversation");
        assert!(ids.contains(&"lt-0"), "long-term from another conversation");
        assert!(ids.contains(&"p-0"), "personality is global");
        // Guaranteed short-term slot puts st-0 first.
        assert_eq!(results[0].id, "st-0");
    }

    #[tokio::test]
    async fn long_term_excludes_current_conversation() {
        let store: Arc<dyn MemoryStore> =
            Arc::new(SqliteMemoryStore::open_in_memory().await.unwrap());

        let mut current = make_record("lt-current", MemoryLayer::LongTerm, 0.8);
        current.keywords = vec!["python".into()];
        current.context = Some(MemoryContext::Conversation("c-now".into()));
        store.insert(current).await.unwrap();

        let config = EngramConfig::default();
        let retriever = Arc::new(HybridRetriever::new(
            Arc::clone(&store),
            Arc::new(MockEmbedder::new()),
            Arc::new(MockKeywordExtractor),
            &config,
        ));
        let engine = FusionEngine::new(
            retriever,
            AccessTracker::new(Arc::clone(&store)),
            &config,
        );

        let results = engine
            .retrieve_tiered("ai-1", "u-1", "c-now", "python")
            .await
            .unwrap();
        assert!(
            !results.iter().any(|r| r.id == "lt-current"),
            "facts from the live conversation are redundant with short-term"
        );
    }
}
