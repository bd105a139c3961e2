// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-backed long-term fact extraction from short-term chunks.
//!
//! Each chunk's messages are formatted into an extraction prompt; the LLM
//! response is parsed defensively into atomic facts. LLM failures retry with
//! backoff and finally degrade to a heuristic sentence extractor, so the
//! pipeline itself never fails on provider trouble. Facts are persisted
//! idempotently: the store's unique index on
//! `(owner, conversation, chunk_index, fact_hash)` is the final arbiter.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use engram_config::EngramConfig;
use engram_core::{
    EmbeddingAdapter, EngramError, Fact, KeywordExtractor, MemoryContent, MemoryContext,
    MemoryLayer, MemoryRecord, MemoryStore, ModelAdapter,
};

use crate::retry::RetryPolicy;

/// Sentences kept by the heuristic fallback must be longer than this.
const HEURISTIC_MIN_LEN: usize = 20;

/// Maximum facts produced by the heuristic fallback.
const HEURISTIC_MAX_FACTS: usize = 3;

/// Verb markers that suggest a sentence states a durable fact.
const FACTUAL_MARKERS: [&str; 12] = [
    "is", "are", "was", "were", "has", "have", "likes", "uses", "lives", "works", "named",
    "prefers",
];

/// Extraction prompt; `{max_facts}` and `{conversation}` are substituted.
const EXTRACTION_PROMPT: &str = r#"Extract up to {max_facts} durable facts about the participants from this conversation.

Return a JSON object of the form:
{"facts": [{"text": "...", "importance": 0.0, "participants": ["..."], "theme": "..."}]}

For each fact:
- "text": the fact as a standalone statement (e.g., "Bob uses Python")
- "importance": how useful this fact is in future conversations, 0.0 to 1.0
- "participants": names of the people the fact is about
- "theme": a short topical label (e.g., "Skill", "Location", "Preference")

Only include facts that are specific and likely to stay true. If there are
no memorable facts, return {"facts": []}.

Conversation:
{conversation}

Output the JSON object only, no explanation:"#;

/// Extracts long-term fact records from short-term conversation chunks.
pub struct FactExtractor {
    store: Arc<dyn MemoryStore>,
    model: Arc<dyn ModelAdapter>,
    embedder: Arc<dyn EmbeddingAdapter>,
    keywords: Arc<dyn KeywordExtractor>,
    max_facts_per_chunk: usize,
    min_importance: f64,
    max_keywords: usize,
    retry: RetryPolicy,
}

impl FactExtractor {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        model: Arc<dyn ModelAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        keywords: Arc<dyn KeywordExtractor>,
        config: &EngramConfig,
    ) -> Self {
        Self {
            store,
            model,
            embedder,
            keywords,
            max_facts_per_chunk: config.extraction.max_facts_per_chunk,
            min_importance: config.extraction.min_importance,
            max_keywords: config.memory.max_keywords,
            retry: RetryPolicy::new(
                config.extraction.max_retries,
                Duration::from_millis(config.extraction.base_delay_ms),
            ),
        }
    }

    /// Extract and persist facts from the given short-term chunks.
    ///
    /// Returns the newly created long-term records. Chunks that yield no
    /// usable text are skipped; duplicate facts are skipped silently; a
    /// single fact's embedding failure drops only that fact.
    pub async fn extract_facts(
        &self,
        owner_id: &str,
        user_ids: &[String],
        conversation_id: &str,
        chunks: &[MemoryRecord],
    ) -> Result<Vec<MemoryRecord>, EngramError> {
        let mut created = Vec::new();

        for chunk in chunks {
            let conversation_text = format_chunk_messages(chunk);
            if conversation_text.trim().is_empty() {
                debug!(chunk_index = ?chunk.chunk_index, "skipping chunk with no usable text");
                continue;
            }

            let facts = self.facts_for_chunk(&conversation_text).await;

            let mut accepted: Vec<Fact> = facts
                .into_iter()
                .filter(|f| f.importance >= self.min_importance)
                .collect();
            accepted.truncate(self.max_facts_per_chunk);

            for fact in accepted {
                match self
                    .persist_fact(owner_id, user_ids, conversation_id, chunk, &fact)
                    .await
                {
                    Ok(Some(record)) => created.push(record),
                    Ok(None) => {
                        debug!(text = %fact.text, "skipped duplicate fact");
                        metrics::counter!("engram_facts_duplicate_total").increment(1);
                    }
                    Err(EngramError::Embedding { message, .. }) => {
                        warn!(text = %fact.text, error = %message, "embedding failed, dropping fact");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        metrics::counter!("engram_facts_extracted_total").increment(created.len() as u64);
        Ok(created)
    }

    /// LLM extraction with retries, falling back to the heuristic extractor
    /// when retries exhaust or the model returns nothing usable.
    async fn facts_for_chunk(&self, conversation_text: &str) -> Vec<Fact> {
        let prompt = build_extraction_prompt(conversation_text, self.max_facts_per_chunk);

        let response = self
            .retry
            .run(|| {
                let prompt = prompt.clone();
                let model = Arc::clone(&self.model);
                async move { model.complete(&prompt).await }
            })
            .await;

        match response {
            Ok(text) => {
                let facts = parse_facts(&text);
                if facts.is_empty() {
                    debug!("LLM returned no usable facts, using heuristic extractor");
                    metrics::counter!("engram_extraction_fallbacks_total").increment(1);
                    heuristic_facts(conversation_text)
                } else {
                    facts
                }
            }
            Err(e) => {
                warn!(error = %e, "LLM extraction exhausted retries, using heuristic extractor");
                metrics::counter!("engram_extraction_fallbacks_total").increment(1);
                heuristic_facts(conversation_text)
            }
        }
    }

    /// Embed and insert one fact; `Ok(None)` means it already existed.
    async fn persist_fact(
        &self,
        owner_id: &str,
        user_ids: &[String],
        conversation_id: &str,
        chunk: &MemoryRecord,
        fact: &Fact,
    ) -> Result<Option<MemoryRecord>, EngramError> {
        let chunk_index = chunk.chunk_index.unwrap_or(0);
        let hash = fact_hash(&fact.text);

        // Fast path: a prior run already stored this fact.
        if self
            .store
            .find_fact(owner_id, conversation_id, chunk_index, &hash)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let keywords = match self.keywords.extract(&fact.text, self.max_keywords).await {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!(error = %e, "keyword extraction failed for fact, storing without keywords");
                Vec::new()
            }
        };

        let embedding = self.embedder.embed(&embedding_input(fact)).await?;

        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            user_ids: user_ids.to_vec(),
            context: Some(MemoryContext::Conversation(conversation_id.to_string())),
            layer: MemoryLayer::LongTerm,
            summary: fact.theme.clone(),
            content: MemoryContent::Fact { fact: fact.clone() },
            keywords,
            importance: fact.importance,
            embedding: Some(embedding),
            access_count: 0,
            last_accessed: None,
            created_at: Utc::now(),
            fact_hash: Some(hash),
            chunk_index: Some(chunk_index),
            message_range: chunk.message_range.clone(),
        };

        match self.store.insert(record).await {
            Ok(record) => Ok(Some(record)),
            // Lost a concurrent race; the fact exists, which is what we wanted.
            Err(EngramError::DuplicateFact { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Format a chunk's stored messages as `"{sender}: {content}"` lines.
fn format_chunk_messages(chunk: &MemoryRecord) -> String {
    match &chunk.content {
        MemoryContent::Messages { messages, .. } => messages
            .iter()
            .map(|m| format!("{}: {}", m.sender_name, m.content))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn build_extraction_prompt(conversation_text: &str, max_facts: usize) -> String {
    EXTRACTION_PROMPT
        .replace("{max_facts}", &max_facts.to_string())
        .replace("{conversation}", conversation_text)
}

/// The text actually embedded for a fact, anchoring it to its participants.
fn embedding_input(fact: &Fact) -> String {
    if fact.participants.is_empty() {
        fact.text.clone()
    } else {
        format!("{} | Participants: {}", fact.text, fact.participants.join(", "))
    }
}

/// Normalize fact text for hashing: trim, lowercase, collapse whitespace.
fn normalize_fact_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Idempotence key: first 16 hex chars of the SHA-256 of the normalized text.
pub fn fact_hash(text: &str) -> String {
    let digest = Sha256::digest(normalize_fact_text(text).as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Parse the LLM response into facts.
///
/// Handles markdown code fences, surrounding prose, non-object entries,
/// missing text, and out-of-range importance. Returns empty on anything
/// unparseable; the caller decides whether to fall back.
fn parse_facts(response: &str) -> Vec<Fact> {
    let trimmed = response.trim();

    // Cut to the outermost JSON object (strips fences and surrounding text).
    let start = trimmed.find('{').unwrap_or(0);
    let end = trimmed.rfind('}').map(|i| i + 1).unwrap_or(trimmed.len());
    let json_str = trimmed.get(start..end).unwrap_or(trimmed);

    let value: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "failed to parse extraction response");
            debug!(response, "raw extraction response");
            return Vec::new();
        }
    };

    let entries = match value.get("facts").and_then(|f| f.as_array()) {
        Some(entries) => entries,
        None => {
            warn!("extraction response has no facts array");
            return Vec::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let text = obj.get("text")?.as_str()?.trim().to_string();
            if text.is_empty() {
                return None;
            }
            let importance = obj
                .get("importance")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.5)
                .clamp(0.0, 1.0);
            let participants = obj
                .get("participants")
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|p| p.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            let theme = obj
                .get("theme")
                .and_then(|v| v.as_str())
                .unwrap_or("General Fact")
                .to_string();
            Some(Fact {
                text,
                importance,
                participants,
                theme,
            })
        })
        .collect()
}

/// Heuristic fallback: keep factual-looking sentences from the raw text.
fn heuristic_facts(text: &str) -> Vec<Fact> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|sentence| sentence.len() > HEURISTIC_MIN_LEN)
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            lower
                .split_whitespace()
                .any(|word| FACTUAL_MARKERS.contains(&word))
        })
        .take(HEURISTIC_MAX_FACTS)
        .map(|sentence| Fact {
            text: sentence.to_string(),
            importance: 0.5,
            participants: Vec::new(),
            theme: "General Fact".to_string(),
        })
        .collect()
}
