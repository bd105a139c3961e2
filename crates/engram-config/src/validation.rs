// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as weight ranges and the guaranteed-minimum budget.

use miette::Diagnostic;
use thiserror::Error;

use crate::model::EngramConfig;

/// A configuration validation error.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A semantic constraint on a deserialized value failed.
    #[error("{message}")]
    #[diagnostic(code(engram::config::validation))]
    Validation { message: String },

    /// Figment failed to deserialize the merged configuration.
    #[error("{message}")]
    #[diagnostic(code(engram::config::parse))]
    Parse { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &EngramConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let r = &config.retrieval;

    for (name, weight) in [
        ("retrieval.vector_weight", r.vector_weight),
        ("retrieval.keyword_weight", r.keyword_weight),
        ("retrieval.short_term_layer_weight", r.short_term_layer_weight),
        ("retrieval.long_term_layer_weight", r.long_term_layer_weight),
        (
            "retrieval.personality_layer_weight",
            r.personality_layer_weight,
        ),
    ] {
        if weight < 0.0 || !weight.is_finite() {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be a non-negative finite number, got {weight}"),
            });
        }
    }

    if r.vector_weight == 0.0 && r.keyword_weight == 0.0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.vector_weight and retrieval.keyword_weight must not both be zero"
                .to_string(),
        });
    }

    if r.total_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.total_limit must be at least 1".to_string(),
        });
    }

    let guaranteed_total =
        r.guaranteed_short_term + r.guaranteed_long_term + r.guaranteed_personality;
    if guaranteed_total > r.total_limit {
        errors.push(ConfigError::Validation {
            message: format!(
                "guaranteed minimums ({guaranteed_total}) exceed retrieval.total_limit ({})",
                r.total_limit
            ),
        });
    }

    if config.extraction.min_importance < 0.0 || config.extraction.min_importance > 1.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "extraction.min_importance must be in [0.0, 1.0], got {}",
                config.extraction.min_importance
            ),
        });
    }

    if config.extraction.max_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "extraction.max_retries must be at least 1".to_string(),
        });
    }

    if config.chunking.short_term_chunk_size == 0 {
        errors.push(ConfigError::Validation {
            message: "chunking.short_term_chunk_size must be at least 1".to_string(),
        });
    }

    if config.chunking.personality_chunk_size == 0 {
        errors.push(ConfigError::Validation {
            message: "chunking.personality_chunk_size must be at least 1".to_string(),
        });
    }

    if config.chunking.personality_chunk_overlap >= config.chunking.personality_chunk_size {
        errors.push(ConfigError::Validation {
            message: format!(
                "chunking.personality_chunk_overlap ({}) must be smaller than chunking.personality_chunk_size ({})",
                config.chunking.personality_chunk_overlap, config.chunking.personality_chunk_size
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
