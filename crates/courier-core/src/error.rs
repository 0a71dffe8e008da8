// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier dispatch queue.

use thiserror::Error;

/// The primary error type used across the queue store, dispatch adapters,
/// and the automation process.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing credentials, bad endpoint).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Dispatch adapter errors that are not a plain recipient rejection.
    #[error("dispatch error: {message}")]
    Dispatch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A persisted payload field could not be encoded or decoded.
    #[error("invalid payload field `{field}`: {message}")]
    Payload { field: String, message: String },

    /// The process was invoked from a non-CLI origin.
    #[error("forbidden: queue workers only run from the command line (origin: {origin})")]
    Forbidden { origin: String },

    /// A process-wide resource ceiling was breached.
    #[error("resource limit exceeded: {resource} (limit {limit}, observed {observed})")]
    ResourceLimit {
        resource: String,
        limit: u64,
        observed: u64,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Wraps any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CourierError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns `true` for errors that must stop the whole process rather
    /// than a single item or run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CourierError::Forbidden { .. }
                | CourierError::ResourceLimit { .. }
                | CourierError::Timeout { .. }
        )
    }
}
