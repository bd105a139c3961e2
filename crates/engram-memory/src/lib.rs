// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tiered memory engine for conversational agents.
//!
//! Three memory layers feed one retrieval surface:
//!
//! - **short-term**: recent conversation chunks, created live by the
//!   [`ShortTermChunker`] and expired by a TTL sweep;
//! - **long-term**: durable facts extracted from closed conversations by the
//!   [`FactExtractor`];
//! - **personality**: a global knowledge base populated by the
//!   [`PersonalityUploader`].
//!
//! Queries go through the [`FusionEngine`], which runs a hybrid
//! vector+keyword [`HybridRetriever`] per layer and fuses the results with
//! guaranteed per-layer minimums and weighted Reciprocal Rank Fusion.
//! All collaborators (store, embedder, keyword extractor, LLM) are injected
//! behind the `engram-core` traits.

pub mod chunker;
pub mod extractor;
pub mod fusion;
pub mod retriever;
pub mod retry;
pub mod splitter;
pub mod tracker;
pub mod uploader;

pub use chunker::ShortTermChunker;
pub use extractor::{fact_hash, FactExtractor};
pub use fusion::FusionEngine;
pub use retriever::HybridRetriever;
pub use retry::RetryPolicy;
pub use splitter::split_text;
pub use tracker::AccessTracker;
pub use uploader::PersonalityUploader;
