// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue routine: one claim-dispatch-commit pass over a channel table.
//!
//! A run moves through `claiming -> claimed -> dispatching` and ends either
//! committed (claimed rows deleted) or stalled (rows left at `sending` under
//! the run's agent id). Store failures end the run early without touching
//! the process; adapter failures only mark their item.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use courier_config::CommitMode;
use courier_core::{
    AgentId, Channel, CourierError, DispatchAdapter, DispatchRequest, Outbound, QueueItem,
    QueueStatus, QueueStore,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::agent;
use crate::benchmark::Benchmark;

/// Translates a stored row into the adapter's channel-specific input.
pub trait Normalizer: Send + Sync {
    fn channel(&self) -> Channel;

    /// Build the outbound payload for one item. An error counts the item as
    /// errored without stopping the batch.
    fn normalize(&self, item: &QueueItem) -> Result<Outbound, CourierError>;
}

/// Per-run knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub batch_size: u32,
    pub commit_mode: CommitMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            batch_size: 300,
            commit_mode: CommitMode::AllOrNothing,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RunOutcome {
    /// Nothing was pending.
    Idle,
    /// Rows were claimed but gone by the time they were fetched.
    Vanished,
    /// Every claimed row was sent and deleted.
    Committed,
    /// At least one row failed; the failed rows (or the whole batch under
    /// all-or-nothing) stay claimed at `sending`.
    Stalled,
    /// A store operation failed; the run stopped where it was.
    StoreUnavailable,
}

/// Summary of one routine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub agent_id: AgentId,
    pub channel: Channel,
    /// Rows stamped by the claim statement.
    pub claimed: usize,
    /// Items handed to normalization and the adapter.
    pub attempted: usize,
    /// Adapter returned `true`.
    pub sent: usize,
    /// Adapter returned `false`.
    pub failed: usize,
    /// Normalization or the adapter returned an error.
    pub errored: usize,
    pub outcome: RunOutcome,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

impl RunReport {
    fn new(agent_id: AgentId, channel: Channel) -> Self {
        Self {
            agent_id,
            channel,
            claimed: 0,
            attempted: 0,
            sent: 0,
            failed: 0,
            errored: 0,
            outcome: RunOutcome::Idle,
            elapsed: Duration::ZERO,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} queue: claimed {}, sent {}, failed {}, errored {}, {} in {:.3}s (agent {})",
            self.channel,
            self.claimed,
            self.sent,
            self.failed,
            self.errored,
            self.outcome,
            self.elapsed.as_secs_f64(),
            self.agent_id,
        )
    }
}

/// Generic claim-based dispatch engine bound to one store, adapter, and
/// normalizer.
pub struct QueueRoutine {
    store: Arc<dyn QueueStore>,
    adapter: Arc<dyn DispatchAdapter>,
    normalizer: Box<dyn Normalizer>,
    options: RunOptions,
}

impl QueueRoutine {
    /// Bind the engine. The store and normalizer must serve the same channel.
    pub fn new(
        store: Arc<dyn QueueStore>,
        adapter: Arc<dyn DispatchAdapter>,
        normalizer: Box<dyn Normalizer>,
        options: RunOptions,
    ) -> Result<Self, CourierError> {
        if store.channel() != normalizer.channel() {
            return Err(CourierError::Internal(format!(
                "{} store paired with {} normalizer",
                store.channel(),
                normalizer.channel()
            )));
        }
        Ok(Self {
            store,
            adapter,
            normalizer,
            options,
        })
    }

    pub fn channel(&self) -> Channel {
        self.store.channel()
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Execute one pass with a freshly generated agent id.
    pub async fn run(&self) -> RunReport {
        self.run_as(agent::generate()).await
    }

    /// Execute one pass under the given agent id.
    pub async fn run_as(&self, agent_id: AgentId) -> RunReport {
        let mut bench = Benchmark::new();
        bench.start();

        let mut report = RunReport::new(agent_id, self.channel());
        report.outcome = self.execute(&mut report).await;
        report.elapsed = bench.stop();

        debug!(
            channel = %report.channel,
            agent_id = %report.agent_id,
            outcome = %report.outcome,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "queue run finished"
        );
        report
    }

    async fn execute(&self, report: &mut RunReport) -> RunOutcome {
        let channel = self.channel();
        let agent_id = report.agent_id.clone();
        let batch_size = self.options.batch_size;

        report.claimed = match self.store.claim(&agent_id, batch_size).await {
            Ok(claimed) => claimed,
            Err(e) => return store_unavailable(channel, &agent_id, "claim", &e),
        };
        if report.claimed == 0 {
            debug!(%channel, agent_id = %agent_id, "no pending items");
            return RunOutcome::Idle;
        }

        let items = match self.store.fetch_claimed(&agent_id, batch_size).await {
            Ok(items) => items,
            Err(e) => return store_unavailable(channel, &agent_id, "fetch", &e),
        };
        if items.is_empty() {
            warn!(
                %channel,
                agent_id = %agent_id,
                claimed = report.claimed,
                "claimed rows disappeared before fetch"
            );
            return RunOutcome::Vanished;
        }

        if let Err(e) = self.store.mark_status(&agent_id, QueueStatus::Sending).await {
            return store_unavailable(channel, &agent_id, "mark sending", &e);
        }
        debug!(%channel, agent_id = %agent_id, claimed = items.len(), "dispatching batch");

        let mut all_succeeded = true;
        for item in &items {
            report.attempted += 1;
            if !self.dispatch(item, report).await {
                all_succeeded = false;
                continue;
            }

            if self.options.commit_mode == CommitMode::PerItem {
                match self.store.delete_item(&agent_id, item.id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(%channel, agent_id = %agent_id, item_id = item.id, "sent item was no longer claimed");
                    }
                    Err(e) => {
                        warn!(%channel, agent_id = %agent_id, item_id = item.id, error = %e, "failed to delete sent item; it stays claimed");
                        all_succeeded = false;
                    }
                }
            }
        }

        if !all_succeeded {
            warn!(
                %channel,
                agent_id = %agent_id,
                sent = report.sent,
                failed = report.failed,
                errored = report.errored,
                commit_mode = ?self.options.commit_mode,
                "batch stalled: failed items remain claimed at sending"
            );
            return RunOutcome::Stalled;
        }

        if self.options.commit_mode == CommitMode::AllOrNothing
            && let Err(e) = self.store.delete_claimed(&agent_id).await
        {
            return store_unavailable(channel, &agent_id, "delete", &e);
        }
        RunOutcome::Committed
    }

    /// Send one item. Returns `true` only when the adapter confirmed the send.
    async fn dispatch(&self, item: &QueueItem, report: &mut RunReport) -> bool {
        let channel = self.channel();
        let outbound = match self.normalizer.normalize(item) {
            Ok(outbound) => outbound,
            Err(e) => {
                warn!(%channel, item_id = item.id, error = %e, "item could not be normalized");
                report.errored += 1;
                return false;
            }
        };

        let request = DispatchRequest {
            item_id: item.id,
            dispatch_id: item.dispatch_id.clone(),
            outbound,
        };
        match self.adapter.send(&request).await {
            Ok(true) => {
                report.sent += 1;
                true
            }
            Ok(false) => {
                debug!(%channel, item_id = item.id, adapter = self.adapter.name(), "adapter reported not sent");
                report.failed += 1;
                false
            }
            Err(e) => {
                warn!(%channel, item_id = item.id, adapter = self.adapter.name(), error = %e, "adapter error");
                report.errored += 1;
                false
            }
        }
    }
}

fn store_unavailable(
    channel: Channel,
    agent_id: &AgentId,
    step: &str,
    error: &CourierError,
) -> RunOutcome {
    warn!(%channel, agent_id = %agent_id, step, error = %error, "queue store unavailable, ending run");
    RunOutcome::StoreUnavailable
}
