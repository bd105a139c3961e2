// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapter implementations for Engram tests.
//!
//! All mocks are deterministic and run without network access, so the
//! integration suite is CI-safe.

pub mod mock_embedder;
pub mod mock_keywords;
pub mod mock_model;

pub use mock_embedder::{seeded_vector, MockEmbedder};
pub use mock_keywords::MockKeywordExtractor;
pub use mock_model::MockModel;
