// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic mock embedding adapter.
//!
//! Vectors are derived from a SHA-256 digest of the input text, so the same
//! text always embeds to the same vector and similar-text assertions stay
//! stable across runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use engram_core::{EmbeddingAdapter, EmbeddingInput, EmbeddingOutput, EngramError};

const DIMENSIONS: usize = 32;

/// A mock embedder producing deterministic, text-seeded unit vectors.
///
/// `failing()` makes every call error; `fail_on(text)` makes only calls for
/// that exact text error, for exercising per-item fallback paths.
pub struct MockEmbedder {
    fail_all: bool,
    fail_on: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            fail_all: false,
            fail_on: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An embedder whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            fail_on: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An embedder that fails only for the given exact text.
    pub fn fail_on(text: impl Into<String>) -> Self {
        Self {
            fail_all: false,
            fail_on: Some(text.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Total number of embed calls made (batch counts as one).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, text: &str) -> Result<(), EngramError> {
        if self.fail_all
            || self
                .fail_on
                .as_deref()
                .is_some_and(|target| target == text)
        {
            return Err(EngramError::Embedding {
                message: "mock embedder failure".into(),
                source: None,
            });
        }
        Ok(())
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a deterministic L2-normalized vector from the text digest.
pub fn seeded_vector(text: &str) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    let mut v: Vec<f32> = digest
        .iter()
        .cycle()
        .take(DIMENSIONS)
        .map(|b| f32::from(*b) / 255.0 - 0.5)
        .collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngramError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check(text)?;
        Ok(seeded_vector(text))
    }

    async fn embed_batch(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EngramError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut embeddings = Vec::with_capacity(input.texts.len());
        for text in &input.texts {
            self.check(text)?;
            embeddings.push(seeded_vector(text));
        }
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: DIMENSIONS,
        })
    }
}
