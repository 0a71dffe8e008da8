// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier release`: hand stalled claims back to the pending pool.

use std::time::Duration;

use courier_config::CourierConfig;
use courier_core::{AgentId, CourierError};
use courier_storage::{ReleaseFilter, SqliteQueueStore};
use tracing::info;

use crate::{ReleaseArgs, ReleaseTarget};

fn filter_for(target: &ReleaseTarget) -> Result<ReleaseFilter, CourierError> {
    match target {
        ReleaseTarget { agent: Some(agent), .. } => Ok(ReleaseFilter::Agent(AgentId(agent.clone()))),
        ReleaseTarget { idle_secs: Some(secs), .. } => {
            Ok(ReleaseFilter::IdleFor(Duration::from_secs(*secs)))
        }
        ReleaseTarget { all: true, .. } => Ok(ReleaseFilter::All),
        _ => Err(CourierError::Config(
            "release needs one of --agent, --idle-secs, or --all".into(),
        )),
    }
}

pub async fn run_release(config: &CourierConfig, args: &ReleaseArgs) -> Result<(), CourierError> {
    let filter = filter_for(&args.target)?;
    let store = SqliteQueueStore::open(args.channel, &config.storage, true).await?;
    let released = store.release(&filter).await?;

    info!(channel = %args.channel, ?filter, released, "claims released");
    println!("released {released} {} queue item(s)", args.channel);
    Ok(())
}
