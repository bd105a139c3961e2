// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Engram memory engine.
//!
//! Provides [`SqliteMemoryStore`], the sole [`engram_core::MemoryStore`]
//! implementation, plus embedded refinery migrations and the embedding
//! BLOB codec.

pub mod migrations;
pub mod store;
pub mod vector;

pub use store::SqliteMemoryStore;
pub use vector::{blob_to_vec, cosine_similarity, vec_to_blob};
