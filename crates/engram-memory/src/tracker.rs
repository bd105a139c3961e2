// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access statistics for surfaced memories.
//!
//! Failures never reach the retrieval caller: one retry per record, then a
//! warning and move on.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use engram_core::{MemoryRecord, MemoryStore};

/// Bumps `access_count`/`last_accessed` for memories returned to a caller.
#[derive(Clone)]
pub struct AccessTracker {
    store: Arc<dyn MemoryStore>,
}

impl AccessTracker {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Record one access for each of `records`.
    pub async fn record_access(&self, records: &[MemoryRecord]) {
        for record in records {
            let mut updated = record.clone();
            updated.access_count += 1;
            updated.last_accessed = Some(Utc::now());

            if let Err(first) = self.store.update(&updated).await {
                warn!(id = %updated.id, error = %first, "access update failed, retrying once");
                if let Err(second) = self.store.update(&updated).await {
                    warn!(id = %updated.id, error = %second, "access update failed after retry, dropping");
                }
            }
        }
    }
}
