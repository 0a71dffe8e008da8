// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier <channel>-queue-worker`: one supervised pass over a channel queue.

use std::sync::Arc;

use courier_config::CourierConfig;
use courier_core::{Channel, CourierError};
use courier_dispatch::{
    AutomationProcess, HttpRelayDispatcher, InvocationContext, RunOutcome, RunReport, routine_for,
};
use courier_storage::SqliteQueueStore;
use tracing::{debug, warn};

use crate::WorkerArgs;
use crate::memory;

/// Run one worker pass for `channel`.
///
/// An unreachable queue store ends the run quietly so the scheduler retries
/// on its next tick. Resource breaches and origin rejections propagate.
pub async fn run_worker(
    config: &CourierConfig,
    channel: Channel,
    args: &WorkerArgs,
) -> Result<(), CourierError> {
    if let Some(date) = &args.date {
        debug!(%channel, date = %date, "worker run date");
    }

    let mut process = AutomationProcess::from_config(InvocationContext::Cli, &config.process)
        .with_memory_probe(memory::probe());
    let db_caching = process.db_caching();

    let Some(report) = process
        .run(dispatch_once(config, channel, args.batch_size, db_caching))
        .await??
    else {
        return Ok(());
    };

    if args.verbose {
        println!("{report}");
        println!(
            "process time: {:.3}s",
            process.benchmark().elapsed().as_secs_f64()
        );
    }
    Ok(())
}

async fn dispatch_once(
    config: &CourierConfig,
    channel: Channel,
    batch_size: Option<u32>,
    db_caching: bool,
) -> Result<Option<RunReport>, CourierError> {
    let store = match SqliteQueueStore::open(channel, &config.storage, db_caching).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(%channel, error = %e, "queue store unavailable, ending run");
            return Ok(None);
        }
    };
    let adapter = Arc::new(HttpRelayDispatcher::new(&config.dispatch)?);
    let routine = routine_for(store, adapter, config, batch_size)?;

    let report = routine.run().await;
    if report.outcome == RunOutcome::Stalled {
        warn!(%channel, agent_id = %report.agent_id, "batch left claimed for manual release");
    }
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{ChannelPayload, NewQueueItem, SmsFields};

    fn config_in(dir: &tempfile::TempDir) -> CourierConfig {
        let mut config = CourierConfig::default();
        config.storage.database_path = dir.path().join("queue.db").to_string_lossy().to_string();
        config
    }

    #[tokio::test]
    async fn empty_queue_is_a_quiet_success() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        run_worker(&config, Channel::Email, &WorkerArgs::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_endpoint_stalls_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let store = SqliteQueueStore::open(Channel::Sms, &config.storage, true)
            .await
            .unwrap();
        store
            .enqueue(&NewQueueItem::new(
                "hello",
                ChannelPayload::Sms(SmsFields {
                    recipient: "+15550100".into(),
                    session: None,
                }),
            ))
            .await
            .unwrap();

        let report = dispatch_once(&config, Channel::Sms, None, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.claimed, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.outcome, RunOutcome::Stalled);
    }

    #[tokio::test]
    async fn unopenable_store_ends_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let mut config = CourierConfig::default();
        config.storage.database_path = blocker.join("queue.db").to_string_lossy().to_string();

        let report = dispatch_once(&config, Channel::Push, None, true).await.unwrap();
        assert!(report.is_none());
    }
}
