// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Engram memory engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides via the `ENGRAM_` prefix.
//!
//! # Usage
//!
//! ```no_run
//! use engram_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("total memory budget: {}", config.retrieval.total_limit);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{ChunkingConfig, EngramConfig, ExtractionConfig, MemorySettings, RetrievalConfig};
pub use validation::{validate_config, ConfigError};

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to a parse diagnostic
pub fn load_and_validate() -> Result<EngramConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Parse {
            message: err.to_string(),
        }]),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<EngramConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Parse {
            message: err.to_string(),
        }]),
    }
}
