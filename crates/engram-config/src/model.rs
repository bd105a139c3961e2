// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model for the Engram memory engine.
//!
//! All sections use `deny_unknown_fields` so typos fail loudly instead of
//! silently falling back to defaults.

use serde::{Deserialize, Serialize};

/// Root configuration for the memory engine.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngramConfig {
    /// Hybrid search and cross-layer fusion settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Long-term fact extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Chunk sizing for short-term memory and personality documents.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Memory lifecycle settings.
    #[serde(default)]
    pub memory: MemorySettings,
}

/// Hybrid search and cross-layer fusion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// RRF weight of the dense vector result list within a layer.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f64,

    /// RRF weight of the sparse keyword result list within a layer.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Candidate over-fetch limit for the short-term layer (pre-fusion).
    #[serde(default = "default_layer_candidates")]
    pub short_term_candidates: usize,

    /// Candidate over-fetch limit for the long-term layer (pre-fusion).
    #[serde(default = "default_layer_candidates")]
    pub long_term_candidates: usize,

    /// Candidate over-fetch limit for the personality layer (pre-fusion).
    #[serde(default = "default_layer_candidates")]
    pub personality_candidates: usize,

    /// Top-ranked short-term results guaranteed a slot in the fused output.
    #[serde(default = "default_guaranteed_short_term")]
    pub guaranteed_short_term: usize,

    /// Top-ranked long-term results guaranteed a slot in the fused output.
    #[serde(default)]
    pub guaranteed_long_term: usize,

    /// Top-ranked personality results guaranteed a slot in the fused output.
    #[serde(default)]
    pub guaranteed_personality: usize,

    /// Cross-layer RRF weight for short-term results (recency matters most).
    #[serde(default = "default_short_term_layer_weight")]
    pub short_term_layer_weight: f64,

    /// Cross-layer RRF weight for long-term results.
    #[serde(default = "default_layer_weight")]
    pub long_term_layer_weight: f64,

    /// Cross-layer RRF weight for personality results.
    #[serde(default = "default_layer_weight")]
    pub personality_layer_weight: f64,

    /// Total memory budget of a fused retrieval.
    #[serde(default = "default_total_limit")]
    pub total_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            short_term_candidates: default_layer_candidates(),
            long_term_candidates: default_layer_candidates(),
            personality_candidates: default_layer_candidates(),
            guaranteed_short_term: default_guaranteed_short_term(),
            guaranteed_long_term: 0,
            guaranteed_personality: 0,
            short_term_layer_weight: default_short_term_layer_weight(),
            long_term_layer_weight: default_layer_weight(),
            personality_layer_weight: default_layer_weight(),
            total_limit: default_total_limit(),
        }
    }
}

/// Long-term fact extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Maximum facts accepted per short-term chunk.
    #[serde(default = "default_max_facts_per_chunk")]
    pub max_facts_per_chunk: usize,

    /// Minimum importance for an extracted fact to be kept.
    #[serde(default = "default_min_importance")]
    pub min_importance: f64,

    /// Maximum LLM call attempts per chunk before the heuristic fallback.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base delay for exponential backoff between attempts, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_facts_per_chunk: default_max_facts_per_chunk(),
            min_importance: default_min_importance(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Chunk sizing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Messages per short-term chunk.
    #[serde(default = "default_short_term_chunk_size")]
    pub short_term_chunk_size: usize,

    /// Character budget per personality document chunk.
    #[serde(default = "default_personality_chunk_size")]
    pub personality_chunk_size: usize,

    /// Character overlap between adjacent personality chunks.
    #[serde(default = "default_personality_chunk_overlap")]
    pub personality_chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            short_term_chunk_size: default_short_term_chunk_size(),
            personality_chunk_size: default_personality_chunk_size(),
            personality_chunk_overlap: default_personality_chunk_overlap(),
        }
    }
}

/// Memory lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemorySettings {
    /// Days before short-term memories become eligible for the TTL sweep.
    #[serde(default = "default_short_term_ttl_days")]
    pub short_term_ttl_days: u32,

    /// Maximum keywords extracted per text.
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            short_term_ttl_days: default_short_term_ttl_days(),
            max_keywords: default_max_keywords(),
        }
    }
}

fn default_vector_weight() -> f64 {
    0.7
}

fn default_keyword_weight() -> f64 {
    0.3
}

fn default_layer_candidates() -> usize {
    5
}

fn default_guaranteed_short_term() -> usize {
    1
}

fn default_short_term_layer_weight() -> f64 {
    2.0
}

fn default_layer_weight() -> f64 {
    1.0
}

fn default_total_limit() -> usize {
    7
}

fn default_max_facts_per_chunk() -> usize {
    5
}

fn default_min_importance() -> f64 {
    0.3
}

fn default_max_retries() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_short_term_chunk_size() -> usize {
    24
}

fn default_personality_chunk_size() -> usize {
    500
}

fn default_personality_chunk_overlap() -> usize {
    50
}

fn default_short_term_ttl_days() -> u32 {
    7
}

fn default_max_keywords() -> usize {
    10
}
