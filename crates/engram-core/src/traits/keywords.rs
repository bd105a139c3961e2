// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword extractor trait for sparse search.

use async_trait::async_trait;

use crate::error::EngramError;

/// Adapter for extracting normalized keywords from arbitrary text.
///
/// Implementations return lowercase, deduplicated keyword lists capped at
/// `max_keywords`. Order carries no meaning for search.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Extract up to `max_keywords` keywords from `text`.
    async fn extract(&self, text: &str, max_keywords: usize) -> Result<Vec<String>, EngramError>;
}
