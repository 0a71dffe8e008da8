// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end queue testing.
//!
//! `TestHarness` assembles a temp SQLite database, one store per channel, a
//! scripted [`MockDispatcher`], and a configuration, and builds routines
//! exactly as the worker binary does.

use std::sync::Arc;

use courier_config::model::StorageConfig;
use courier_config::{CommitMode, CourierConfig};
use courier_core::{Channel, CourierError, NewQueueItem};
use courier_dispatch::{QueueRoutine, RunReport, routine_for};
use courier_storage::SqliteQueueStore;

use crate::mock_dispatcher::MockDispatcher;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: CourierConfig,
    results: Vec<Result<bool, CourierError>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: CourierConfig::default(),
            results: Vec::new(),
        }
    }

    /// Set the claim batch size.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.config.queue.batch_size = batch_size;
        self
    }

    /// Set the batch settlement policy.
    pub fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.config.queue.commit_mode = mode;
        self
    }

    /// Set the SMS session injected for items stored without one.
    pub fn with_default_session(mut self, session: impl Into<String>) -> Self {
        self.config.sms.default_session = session.into();
        self
    }

    /// Open a connection per operation instead of reusing one.
    pub fn without_db_caching(mut self) -> Self {
        self.config.process.db_caching = false;
        self
    }

    /// Script the mock dispatcher's results, in send order.
    pub fn with_dispatch_results(mut self, results: Vec<Result<bool, CourierError>>) -> Self {
        self.results = results;
        self
    }

    /// Build the harness, creating the temp database and stores.
    pub async fn build(self) -> Result<TestHarness, CourierError> {
        let temp_dir = tempfile::TempDir::new().map_err(CourierError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        };

        let caching = config.process.db_caching;
        let email = Arc::new(SqliteQueueStore::open(Channel::Email, &config.storage, caching).await?);
        let sms = Arc::new(SqliteQueueStore::open(Channel::Sms, &config.storage, caching).await?);
        let push = Arc::new(SqliteQueueStore::open(Channel::Push, &config.storage, caching).await?);

        Ok(TestHarness {
            dispatcher: Arc::new(MockDispatcher::with_results(self.results)),
            email,
            sms,
            push,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete queue environment with a mock dispatcher and temp storage.
pub struct TestHarness {
    /// The scripted dispatch adapter shared by every routine.
    pub dispatcher: Arc<MockDispatcher>,
    pub email: Arc<SqliteQueueStore>,
    pub sms: Arc<SqliteQueueStore>,
    pub push: Arc<SqliteQueueStore>,
    /// Configuration the routines are built from.
    pub config: CourierConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The store for `channel`.
    pub fn store(&self, channel: Channel) -> Arc<SqliteQueueStore> {
        match channel {
            Channel::Email => self.email.clone(),
            Channel::Sms => self.sms.clone(),
            Channel::Push => self.push.clone(),
        }
    }

    /// Enqueue an item on the store matching its payload.
    pub async fn enqueue(&self, item: NewQueueItem) -> Result<i64, CourierError> {
        self.store(item.payload.channel()).enqueue(&item).await
    }

    /// Build the routine for `channel` against the mock dispatcher.
    pub fn routine(&self, channel: Channel) -> Result<QueueRoutine, CourierError> {
        routine_for(self.store(channel), self.dispatcher.clone(), &self.config, None)
    }

    /// Build and run one pass of the routine for `channel`.
    pub async fn run(&self, channel: Channel) -> Result<RunReport, CourierError> {
        Ok(self.routine(channel)?.run().await)
    }

    /// Path of the temp database.
    pub fn database_path(&self) -> &str {
        &self.config.storage.database_path
    }
}
