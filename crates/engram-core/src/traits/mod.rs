// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Engram dependency-injection seams.
//!
//! The engine never talks to a concrete provider, extractor, or database;
//! every collaborator is passed in behind one of these `#[async_trait]`
//! traits at construction time.

pub mod embedding;
pub mod keywords;
pub mod model;
pub mod store;

// Re-export all traits at the traits module level for convenience.
pub use embedding::EmbeddingAdapter;
pub use keywords::KeywordExtractor;
pub use model::ModelAdapter;
pub use store::MemoryStore;
