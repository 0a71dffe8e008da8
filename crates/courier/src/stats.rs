// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier stats`: per-channel queue counts.

use std::sync::Arc;

use courier_config::CourierConfig;
use courier_core::{Channel, CourierError};
use courier_storage::{Database, QueueStats, SqliteQueueStore};

/// Collect stats for every channel over one connection.
pub async fn collect(config: &CourierConfig) -> Result<Vec<QueueStats>, CourierError> {
    let db = Arc::new(Database::open_with(&config.storage).await?);
    let mut all = Vec::with_capacity(Channel::ALL.len());
    for channel in Channel::ALL {
        let store = SqliteQueueStore::shared(channel, db.clone());
        all.push(store.stats().await?);
    }
    Ok(all)
}

pub async fn run_stats(config: &CourierConfig, json: bool) -> Result<(), CourierError> {
    let all = collect(config).await?;
    if json {
        let output = serde_json::to_string_pretty(&all).unwrap_or_else(|_| "[]".to_string());
        println!("{output}");
    } else {
        print!("{}", render_table(&all));
    }
    Ok(())
}

fn render_table(all: &[QueueStats]) -> String {
    let mut out = format!(
        "{:<8} {:>8} {:>8} {:>8} {:>7}  {}\n",
        "channel", "pending", "claimed", "sending", "agents", "oldest pending"
    );
    for stats in all {
        out.push_str(&format!(
            "{:<8} {:>8} {:>8} {:>8} {:>7}  {}\n",
            stats.channel,
            stats.pending,
            stats.claimed,
            stats.sending,
            stats.agents,
            stats.oldest_pending.as_deref().unwrap_or("-"),
        ));
    }
    out
}
