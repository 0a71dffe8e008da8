// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel queue store trait.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{AgentId, Channel, QueueItem, QueueStatus};

/// Persistence contract for one channel's queue table.
///
/// Every mutating operation is scoped to an [`AgentId`]: rows claimed by one
/// run are never touched through another run's id.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// The channel whose table this store owns.
    fn channel(&self) -> Channel;

    /// Atomically stamps `agent_id` on up to `batch_size` unclaimed pending
    /// rows, ordered by `priority DESC, created_at ASC`. Returns the number
    /// of rows claimed.
    ///
    /// Implementations must do this in a single statement; it is the only
    /// synchronization point between concurrent workers.
    async fn claim(&self, agent_id: &AgentId, batch_size: u32) -> Result<usize, CourierError>;

    /// Returns the rows owned by `agent_id`, fully hydrated, in claim order.
    ///
    /// Undecodable blob fields come back as `None`; they never fail the fetch.
    async fn fetch_claimed(
        &self,
        agent_id: &AgentId,
        batch_size: u32,
    ) -> Result<Vec<QueueItem>, CourierError>;

    /// Sets `status` on every row owned by `agent_id`.
    async fn mark_status(
        &self,
        agent_id: &AgentId,
        status: QueueStatus,
    ) -> Result<bool, CourierError>;

    /// Deletes every row owned by `agent_id`. Deletion is the sent signal.
    async fn delete_claimed(&self, agent_id: &AgentId) -> Result<bool, CourierError>;

    /// Deletes a single row owned by `agent_id`.
    async fn delete_item(&self, agent_id: &AgentId, id: i64) -> Result<bool, CourierError>;
}
