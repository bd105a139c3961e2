// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for generating fixed-dimension vector embeddings from text.
///
/// Implementations must return batch embeddings in the same order as the
/// input texts; personality chunks are linked to their vectors by index.
#[async_trait]
pub trait EmbeddingAdapter: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngramError>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EngramError>;
}
