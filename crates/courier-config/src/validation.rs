// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the semantic constraints serde cannot express: numeric ranges,
//! non-empty paths, and URL shape.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// Largest batch a single run may claim.
pub const MAX_BATCH_SIZE: u32 = 10_000;

/// Smallest accepted memory ceiling (64 MiB).
pub const MIN_MEMORY_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let batch = config.queue.batch_size;
    if batch == 0 || batch > MAX_BATCH_SIZE {
        errors.push(ConfigError::validation(format!(
            "queue.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {batch}"
        )));
    }

    if config.process.time_limit_secs == 0 {
        errors.push(ConfigError::validation(
            "process.time_limit_secs must be greater than 0",
        ));
    }

    if config.process.memory_limit_bytes < MIN_MEMORY_LIMIT_BYTES {
        errors.push(ConfigError::validation(format!(
            "process.memory_limit_bytes must be at least {MIN_MEMORY_LIMIT_BYTES} (64 MiB), got {}",
            config.process.memory_limit_bytes
        )));
    }

    let endpoint = config.dispatch.endpoint.trim();
    if !endpoint.is_empty()
        && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        errors.push(ConfigError::validation(format!(
            "dispatch.endpoint `{endpoint}` must be an http:// or https:// URL"
        )));
    }

    if config.dispatch.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "dispatch.timeout_secs must be greater than 0",
        ));
    }

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "log.level `{}` must be one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
