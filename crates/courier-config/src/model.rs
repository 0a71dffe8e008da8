// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier dispatch queue.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Every section is optional and defaults to the values a cron-driven worker
/// needs out of the box.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Batch claiming and commit behaviour.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Process-wide resource ceilings.
    #[serde(default)]
    pub process: ProcessConfig,

    /// SMS channel defaults.
    #[serde(default)]
    pub sms: SmsConfig,

    /// HTTP relay that performs the actual transport sends.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| "courier.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// How a run settles its batch once every item has been attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Delete the whole batch only if every item was sent; otherwise leave
    /// the entire batch claimed at `sending`.
    #[default]
    AllOrNothing,
    /// Delete each item as soon as it is sent; failed items stay claimed.
    PerItem,
}

/// Queue claiming configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum rows claimed per run.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Batch settlement policy.
    #[serde(default)]
    pub commit_mode: CommitMode,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            commit_mode: CommitMode::default(),
        }
    }
}

fn default_batch_size() -> u32 {
    300
}

/// Resource ceilings applied around every worker run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    /// Allocated-bytes ceiling checked by the memory watchdog.
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: u64,

    /// Wall-clock ceiling for one run.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u64,

    /// Reuse one database connection for the whole run instead of opening
    /// one per query.
    #[serde(default = "default_db_caching")]
    pub db_caching: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: default_memory_limit_bytes(),
            time_limit_secs: default_time_limit_secs(),
            db_caching: default_db_caching(),
        }
    }
}

fn default_memory_limit_bytes() -> u64 {
    2_800_000_000
}

fn default_time_limit_secs() -> u64 {
    3400
}

fn default_db_caching() -> bool {
    true
}

/// SMS channel defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Provider session injected when a queued SMS has none.
    #[serde(default)]
    pub default_session: String,
}

/// HTTP relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Relay base URL. Items are POSTed to `{endpoint}/{channel}`.
    /// Empty leaves the relay unconfigured.
    #[serde(default)]
    pub endpoint: String,

    /// Per-request timeout.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional bearer token sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: default_dispatch_timeout_secs(),
            api_key: None,
        }
    }
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
