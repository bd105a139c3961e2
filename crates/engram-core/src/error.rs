// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Engram memory engine.

use thiserror::Error;

/// The primary error type used across all Engram adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum EngramError {
    /// Configuration errors (invalid TOML, missing required fields, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A fact insert collided with an existing `(owner, conversation, chunk, fact_hash)`
    /// identity. Callers treat this as the idempotence signal, not a failure.
    #[error("duplicate fact for chunk {chunk_index}: {fact_hash}")]
    DuplicateFact { chunk_index: i64, fact_hash: String },

    /// Embedding provider errors (transport failure, dimension mismatch, empty output).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Fact extraction failed after exhausting retries and the heuristic fallback.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Tiered retrieval failed across every memory layer.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngramError {
    /// True when this error is the storage-level duplicate-fact signal.
    pub fn is_duplicate_fact(&self) -> bool {
        matches!(self, EngramError::DuplicateFact { .. })
    }
}
