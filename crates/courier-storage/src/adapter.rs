// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`QueueStore`] trait.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use courier_config::model::StorageConfig;
use courier_core::{AgentId, Channel, CourierError, NewQueueItem, QueueItem, QueueStatus, QueueStore};
use tracing::debug;

use crate::database::Database;
use crate::models::{QueueStats, ReleaseFilter};
use crate::queries;

/// Where a store gets its connection from.
enum ConnectionSource {
    /// One connection reused for the store's lifetime.
    Shared(Arc<Database>),
    /// A fresh connection per operation, dropped when the operation ends.
    PerOperation(StorageConfig),
}

/// Borrowed or freshly opened database for a single operation.
enum DbHandle<'a> {
    Shared(&'a Database),
    Owned(Database),
}

impl Deref for DbHandle<'_> {
    type Target = Database;

    fn deref(&self) -> &Database {
        match self {
            DbHandle::Shared(db) => db,
            DbHandle::Owned(db) => db,
        }
    }
}

/// SQLite-backed queue store for one channel table.
pub struct SqliteQueueStore {
    channel: Channel,
    source: ConnectionSource,
}

impl SqliteQueueStore {
    /// Store that reuses `db` for every operation.
    pub fn shared(channel: Channel, db: Arc<Database>) -> Self {
        Self {
            channel,
            source: ConnectionSource::Shared(db),
        }
    }

    /// Open a store for `channel`.
    ///
    /// Migrations run once here. With `db_caching` the connection is kept;
    /// otherwise every operation opens and drops its own connection.
    pub async fn open(
        channel: Channel,
        config: &StorageConfig,
        db_caching: bool,
    ) -> Result<Self, CourierError> {
        let db = Database::open_with(config).await?;
        if db_caching {
            debug!(%channel, path = %config.database_path, "queue store using a cached connection");
            return Ok(Self::shared(channel, Arc::new(db)));
        }

        db.close().await?;
        debug!(%channel, path = %config.database_path, "queue store using per-operation connections");
        Ok(Self {
            channel,
            source: ConnectionSource::PerOperation(config.clone()),
        })
    }

    /// Whether this store holds one connection for its lifetime.
    pub fn is_cached(&self) -> bool {
        matches!(self.source, ConnectionSource::Shared(_))
    }

    async fn db(&self) -> Result<DbHandle<'_>, CourierError> {
        match &self.source {
            ConnectionSource::Shared(db) => Ok(DbHandle::Shared(db)),
            ConnectionSource::PerOperation(config) => {
                Ok(DbHandle::Owned(Database::connect(config).await?))
            }
        }
    }

    /// Insert a new pending row. The payload must belong to this store's channel.
    pub async fn enqueue(&self, item: &NewQueueItem) -> Result<i64, CourierError> {
        let item_channel = item.payload.channel();
        if item_channel != self.channel {
            return Err(CourierError::Payload {
                field: "payload".into(),
                message: format!(
                    "{item_channel} payload cannot be enqueued on the {} queue",
                    self.channel
                ),
            });
        }
        queries::queue::enqueue(&*self.db().await?, item).await
    }

    /// Manually return claimed rows to the pending pool.
    pub async fn release(&self, filter: &ReleaseFilter) -> Result<usize, CourierError> {
        queries::queue::release(&*self.db().await?, self.channel, filter).await
    }

    /// Row counts for this channel.
    pub async fn stats(&self) -> Result<QueueStats, CourierError> {
        queries::queue::stats(&*self.db().await?, self.channel).await
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn claim(&self, agent_id: &AgentId, batch_size: u32) -> Result<usize, CourierError> {
        queries::queue::claim(&*self.db().await?, self.channel, agent_id, batch_size).await
    }

    async fn fetch_claimed(
        &self,
        agent_id: &AgentId,
        batch_size: u32,
    ) -> Result<Vec<QueueItem>, CourierError> {
        queries::queue::fetch_claimed(&*self.db().await?, self.channel, agent_id, batch_size)
            .await
    }

    async fn mark_status(
        &self,
        agent_id: &AgentId,
        status: QueueStatus,
    ) -> Result<bool, CourierError> {
        queries::queue::mark_status(&*self.db().await?, self.channel, agent_id, status).await
    }

    async fn delete_claimed(&self, agent_id: &AgentId) -> Result<bool, CourierError> {
        queries::queue::delete_claimed(&*self.db().await?, self.channel, agent_id).await
    }

    async fn delete_item(&self, agent_id: &AgentId, id: i64) -> Result<bool, CourierError> {
        queries::queue::delete_item(&*self.db().await?, self.channel, agent_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{ChannelPayload, SmsFields};
    use tempfile::tempdir;

    fn storage_config(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir.path().join("store.db").to_str().unwrap().to_string(),
            ..StorageConfig::default()
        }
    }

    fn sms(to: &str) -> NewQueueItem {
        NewQueueItem::new(
            "code 1234",
            ChannelPayload::Sms(SmsFields {
                recipient: to.to_string(),
                session: None,
            }),
        )
    }

    #[tokio::test]
    async fn cached_and_uncached_stores_see_the_same_rows() {
        let dir = tempdir().unwrap();
        let config = storage_config(&dir);

        let cached = SqliteQueueStore::open(Channel::Sms, &config, true).await.unwrap();
        let uncached = SqliteQueueStore::open(Channel::Sms, &config, false).await.unwrap();
        assert!(cached.is_cached());
        assert!(!uncached.is_cached());

        cached.enqueue(&sms("+15550100")).await.unwrap();
        let run = AgentId("run".into());
        assert_eq!(uncached.claim(&run, 10).await.unwrap(), 1);

        let items = cached.fetch_claimed(&run, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(uncached.delete_claimed(&run).await.unwrap());
        assert_eq!(cached.stats().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn enqueue_rejects_foreign_channel_payload() {
        let dir = tempdir().unwrap();
        let store = SqliteQueueStore::open(Channel::Email, &storage_config(&dir), true)
            .await
            .unwrap();

        let err = store.enqueue(&sms("+15550100")).await.unwrap_err();
        assert!(matches!(err, CourierError::Payload { .. }));
    }

    #[tokio::test]
    async fn stores_sharing_a_database_stay_on_their_tables() {
        let dir = tempdir().unwrap();
        let db = Arc::new(Database::open_with(&storage_config(&dir)).await.unwrap());
        let sms_store = SqliteQueueStore::shared(Channel::Sms, db.clone());
        let push_store = SqliteQueueStore::shared(Channel::Push, db);

        sms_store.enqueue(&sms("+15550100")).await.unwrap();
        assert_eq!(push_store.channel(), Channel::Push);
        assert_eq!(push_store.claim(&AgentId("run".into()), 10).await.unwrap(), 0);
        assert_eq!(sms_store.stats().await.unwrap().pending, 1);
    }
}
