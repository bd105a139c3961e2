// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM adapter trait for fact extraction.

use async_trait::async_trait;

use crate::error::EngramError;

/// Adapter for the fact-extraction LLM.
///
/// `complete` is expected to return JSON but may not; callers must parse
/// the response defensively.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Send a single completion prompt and return the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String, EngramError>;
}
