// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Courier dispatch queue.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, one queue table
//! per channel, and the single-statement claim that keeps concurrent workers
//! from selecting the same rows.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteQueueStore;
pub use database::Database;
pub use models::{QueueStats, ReleaseFilter};
