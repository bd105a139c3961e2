// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Engram memory engine.
//!
//! This crate provides the foundational trait definitions, error type, and
//! memory domain types used throughout the Engram workspace. Concrete
//! adapters (SQLite store, embedding providers, LLM clients) implement the
//! traits defined here and are injected into the engine at construction.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::EngramError;
pub use types::{
    EmbeddingInput, EmbeddingOutput, Fact, MemoryContent, MemoryContext, MemoryLayer, MemoryRecord,
    SearchFilters, StoredMessage,
};

// Re-export all adapter traits at crate root.
pub use traits::{EmbeddingAdapter, KeywordExtractor, MemoryStore, ModelAdapter};
