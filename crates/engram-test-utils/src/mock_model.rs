// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM adapter for deterministic testing.
//!
//! `MockModel` implements `ModelAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use engram_core::{EngramError, ModelAdapter};

/// A mock LLM that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default `{"facts": []}` payload is returned. The first
/// `fail_times` calls error, for exercising retry paths.
pub struct MockModel {
    responses: Arc<Mutex<VecDeque<String>>>,
    failures_remaining: Arc<Mutex<usize>>,
    calls: Arc<AtomicUsize>,
}

impl MockModel {
    /// Create a new mock model with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            failures_remaining: Arc::new(Mutex::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock model pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            failures_remaining: Arc::new(Mutex::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the next `count` calls fail before responses are served.
    pub fn fail_times(self, count: usize) -> Self {
        if let Ok(mut failures) = self.failures_remaining.try_lock() {
            *failures = count;
        }
        self
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Total number of `complete` calls made, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelAdapter for MockModel {
    async fn complete(&self, _prompt: &str) -> Result<String, EngramError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut failures = self.failures_remaining.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(EngramError::Provider {
                message: "mock model failure".into(),
                source: None,
            });
        }
        drop(failures);

        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| r#"{"facts": []}"#.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let model = MockModel::with_responses(vec!["first".into(), "second".into()]);
        assert_eq!(model.complete("p").await.unwrap(), "first");
        assert_eq!(model.complete("p").await.unwrap(), "second");
        // Queue exhausted, falls back to the empty facts payload
        assert_eq!(model.complete("p").await.unwrap(), r#"{"facts": []}"#);
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn fail_times_errors_before_serving() {
        let model = MockModel::with_responses(vec!["ok".into()]).fail_times(2);
        assert!(model.complete("p").await.is_err());
        assert!(model.complete("p").await.is_err());
        assert_eq!(model.complete("p").await.unwrap(), "ok");
        assert_eq!(model.call_count(), 3);
    }
}
