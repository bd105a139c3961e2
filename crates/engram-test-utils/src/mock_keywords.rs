// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock keyword extractor: lowercase whitespace tokenization.

use async_trait::async_trait;

use engram_core::{EngramError, KeywordExtractor};

/// A keyword extractor that lowercases, strips punctuation, splits on
/// whitespace, and deduplicates while preserving first-seen order.
pub struct MockKeywordExtractor;

#[async_trait]
impl KeywordExtractor for MockKeywordExtractor {
    async fn extract(&self, text: &str, max_keywords: usize) -> Result<Vec<String>, EngramError> {
        let mut keywords: Vec<String> = Vec::new();
        for token in text.split_whitespace() {
            let cleaned: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if !cleaned.is_empty() && !keywords.contains(&cleaned) {
                keywords.push(cleaned);
            }
            if keywords.len() >= max_keywords {
                break;
            }
        }
        Ok(keywords)
    }
}
