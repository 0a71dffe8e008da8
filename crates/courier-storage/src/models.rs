// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-side types for operator commands.

use std::time::Duration;

use courier_core::{AgentId, Channel};
use serde::Serialize;

/// Which claimed rows a manual release returns to the pending pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseFilter {
    /// Rows claimed by one run.
    Agent(AgentId),
    /// Claimed rows whose `updated_at` is at least this old.
    IdleFor(Duration),
    /// Every claimed row in the table.
    All,
}

/// Row counts for one channel table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub channel: Channel,
    /// Unclaimed rows waiting for a worker.
    pub pending: u64,
    /// Claimed rows not yet marked `sending` (a run in progress or aborted
    /// between claim and dispatch).
    pub claimed: u64,
    /// Rows at `sending`: in flight, or stalled by a failed batch.
    pub sending: u64,
    /// Distinct agent ids holding claims.
    pub agents: u64,
    /// Creation time of the oldest unclaimed row.
    pub oldest_pending: Option<String>,
}
