// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim-based queue operations on the per-channel tables.
//!
//! Every function takes the [`Channel`] whose table it works on. Table names
//! come from [`Channel::table`] and are never caller-supplied strings.

use std::str::FromStr;

use chrono::Utc;
use courier_core::types::{decode_blob, encode_blob};
use courier_core::{
    AgentId, Channel, ChannelPayload, CourierError, EmailFields, NewQueueItem, PushFields,
    QueueItem, QueueStatus, SmsFields,
};
use rusqlite::types::{Type, Value};
use rusqlite::{Row, params, params_from_iter};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::database::{Database, map_tr_err};
use crate::models::{QueueStats, ReleaseFilter};

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Claim order. `id` breaks ties between rows created in the same millisecond.
const CLAIM_ORDER: &str = "priority DESC, created_at ASC, id ASC";

fn columns(channel: Channel) -> &'static str {
    match channel {
        Channel::Email => {
            "id, created_at, updated_at, agent_id, dispatch_id, message, priority, status, \
             recipient, sender, from_name, subject, unsubscribe_url, attachments"
        }
        Channel::Sms => {
            "id, created_at, updated_at, agent_id, dispatch_id, message, priority, status, \
             recipient, session"
        }
        Channel::Push => {
            "id, created_at, updated_at, agent_id, dispatch_id, message, priority, status, \
             subscriptions"
        }
    }
}

fn text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

/// Decode a blob column, downgrading empty or corrupt content to `None`.
fn decode_list<T: DeserializeOwned>(item_id: i64, field: &str, raw: Option<&str>) -> Option<Vec<T>> {
    match decode_blob::<Vec<T>>(field, raw) {
        Ok(list) => list.filter(|l| !l.is_empty()),
        Err(e) => {
            warn!(item_id, field, error = %e, "undecodable blob column, treating as empty");
            None
        }
    }
}

fn row_to_item(channel: Channel, row: &Row<'_>) -> Result<QueueItem, rusqlite::Error> {
    let id: i64 = row.get(0)?;
    let status: String = row.get(7)?;
    let status = QueueStatus::from_str(&status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    let payload = match channel {
        Channel::Email => ChannelPayload::Email(EmailFields {
            recipient: row.get(8)?,
            from: row.get(9)?,
            from_name: row.get(10)?,
            subject: row.get(11)?,
            unsubscribe_url: row.get(12)?,
            attachments: decode_list(id, "attachments", row.get::<_, Option<String>>(13)?.as_deref()),
        }),
        Channel::Sms => ChannelPayload::Sms(SmsFields {
            recipient: row.get(8)?,
            session: row.get(9)?,
        }),
        Channel::Push => ChannelPayload::Push(PushFields {
            subscriptions: decode_list(
                id,
                "subscriptions",
                row.get::<_, Option<String>>(8)?.as_deref(),
            ),
        }),
    };

    Ok(QueueItem {
        id,
        created_at: row.get(1)?,
        updated_at: row.get(2)?,
        agent_id: row.get::<_, Option<String>>(3)?.map(AgentId),
        dispatch_id: row.get(4)?,
        message: row.get(5)?,
        priority: row.get(6)?,
        status,
        payload,
    })
}

/// Insert a new unclaimed `pending` row. Returns the assigned id.
///
/// The target table follows the payload's channel.
pub async fn enqueue(db: &Database, item: &NewQueueItem) -> Result<i64, CourierError> {
    let common = [
        text(&item.dispatch_id),
        Value::Text(item.message.clone()),
        Value::Integer(i64::from(item.priority)),
    ];

    let (sql, extras): (&'static str, Vec<Value>) = match &item.payload {
        ChannelPayload::Email(fields) => {
            let attachments = fields
                .attachments
                .as_ref()
                .filter(|a| !a.is_empty())
                .map(|a| encode_blob("attachments", a))
                .transpose()?;
            (
                "INSERT INTO email_queue (dispatch_id, message, priority, recipient, sender, \
                 from_name, subject, unsubscribe_url, attachments) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                vec![
                    Value::Text(fields.recipient.clone()),
                    text(&fields.from),
                    text(&fields.from_name),
                    text(&fields.subject),
                    text(&fields.unsubscribe_url),
                    text(&attachments),
                ],
            )
        }
        ChannelPayload::Sms(fields) => (
            "INSERT INTO sms_queue (dispatch_id, message, priority, recipient, session) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            vec![Value::Text(fields.recipient.clone()), text(&fields.session)],
        ),
        ChannelPayload::Push(fields) => {
            let subscriptions = fields
                .subscriptions
                .as_ref()
                .filter(|s| !s.is_empty())
                .map(|s| encode_blob("subscriptions", s))
                .transpose()?;
            (
                "INSERT INTO push_queue (dispatch_id, message, priority, subscriptions) \
                 VALUES (?1, ?2, ?3, ?4)",
                vec![text(&subscriptions)],
            )
        }
    };

    let values: Vec<Value> = common.into_iter().chain(extras).collect();
    db.connection()
        .call(move |conn| {
            conn.execute(sql, params_from_iter(values))?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Stamp `agent_id` on up to `batch_size` unclaimed pending rows.
///
/// One UPDATE statement: selection and stamping cannot interleave with
/// another claim, in this process or any other. Returns the claimed count.
pub async fn claim(
    db: &Database,
    channel: Channel,
    agent_id: &AgentId,
    batch_size: u32,
) -> Result<usize, CourierError> {
    let table = channel.table();
    let agent = agent_id.to_string();
    let sql = format!(
        "UPDATE {table} SET agent_id = ?1, updated_at = {NOW}
         WHERE agent_id IS NULL AND id IN (
             SELECT id FROM {table}
             WHERE agent_id IS NULL AND status = 'pending'
             ORDER BY {CLAIM_ORDER}
             LIMIT ?2
         )"
    );

    let claimed = db
        .connection()
        .call(move |conn| conn.execute(&sql, params![agent, batch_size]))
        .await
        .map_err(map_tr_err)?;
    debug!(%channel, agent_id = %agent_id, claimed, "claim statement executed");
    Ok(claimed)
}

/// Rows currently claimed by `agent_id`, in claim order.
pub async fn fetch_claimed(
    db: &Database,
    channel: Channel,
    agent_id: &AgentId,
    batch_size: u32,
) -> Result<Vec<QueueItem>, CourierError> {
    let table = channel.table();
    let cols = columns(channel);
    let agent = agent_id.to_string();
    let sql = format!(
        "SELECT {cols} FROM {table} WHERE agent_id = ?1 ORDER BY {CLAIM_ORDER} LIMIT ?2"
    );

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![agent, batch_size], |row| row_to_item(channel, row))?;
            let items = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
        .await
        .map_err(map_tr_err)
}

/// Set `status` on every row claimed by `agent_id`. Returns `true` if any
/// row changed.
pub async fn mark_status(
    db: &Database,
    channel: Channel,
    agent_id: &AgentId,
    status: QueueStatus,
) -> Result<bool, CourierError> {
    let table = channel.table();
    let agent = agent_id.to_string();
    let status = status.to_string();
    let sql = format!("UPDATE {table} SET status = ?2, updated_at = {NOW} WHERE agent_id = ?1");

    let changed = db
        .connection()
        .call(move |conn| conn.execute(&sql, params![agent, status]))
        .await
        .map_err(map_tr_err)?;
    Ok(changed > 0)
}

/// Delete every row claimed by `agent_id`. Returns `true` if any row was removed.
pub async fn delete_claimed(
    db: &Database,
    channel: Channel,
    agent_id: &AgentId,
) -> Result<bool, CourierError> {
    let table = channel.table();
    let agent = agent_id.to_string();
    let sql = format!("DELETE FROM {table} WHERE agent_id = ?1");

    let deleted = db
        .connection()
        .call(move |conn| conn.execute(&sql, params![agent]))
        .await
        .map_err(map_tr_err)?;
    Ok(deleted > 0)
}

/// Delete one row, only if `agent_id` still holds its claim.
pub async fn delete_item(
    db: &Database,
    channel: Channel,
    agent_id: &AgentId,
    id: i64,
) -> Result<bool, CourierError> {
    let table = channel.table();
    let agent = agent_id.to_string();
    let sql = format!("DELETE FROM {table} WHERE agent_id = ?1 AND id = ?2");

    let deleted = db
        .connection()
        .call(move |conn| conn.execute(&sql, params![agent, id]))
        .await
        .map_err(map_tr_err)?;
    Ok(deleted > 0)
}

/// Return claimed rows matching `filter` to the unclaimed pending pool.
///
/// Covers rows stalled at `sending` and rows claimed by a run that died
/// before marking them. Returns the number of rows released.
pub async fn release(
    db: &Database,
    channel: Channel,
    filter: &ReleaseFilter,
) -> Result<usize, CourierError> {
    let table = channel.table();
    let (predicate, values): (&str, Vec<Value>) = match filter {
        ReleaseFilter::Agent(agent_id) => ("agent_id = ?1", vec![Value::Text(agent_id.to_string())]),
        ReleaseFilter::IdleFor(idle) => {
            let cutoff = chrono::TimeDelta::from_std(*idle)
                .ok()
                .and_then(|d| Utc::now().checked_sub_signed(d));
            let Some(cutoff) = cutoff else {
                return Ok(0);
            };
            (
                "agent_id IS NOT NULL AND updated_at <= ?1",
                vec![Value::Text(
                    cutoff.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                )],
            )
        }
        ReleaseFilter::All => ("agent_id IS NOT NULL", Vec::new()),
    };
    let sql = format!(
        "UPDATE {table} SET agent_id = NULL, status = 'pending', updated_at = {NOW} WHERE {predicate}"
    );

    db.connection()
        .call(move |conn| conn.execute(&sql, params_from_iter(values)))
        .await
        .map_err(map_tr_err)
}

/// Row counts for one channel table.
pub async fn stats(db: &Database, channel: Channel) -> Result<QueueStats, CourierError> {
    let table = channel.table();
    let sql = format!(
        "SELECT
            COALESCE(SUM(CASE WHEN agent_id IS NULL AND status = 'pending' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN agent_id IS NOT NULL AND status = 'pending' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'sending' THEN 1 ELSE 0 END), 0),
            COUNT(DISTINCT agent_id),
            MIN(CASE WHEN agent_id IS NULL THEN created_at END)
         FROM {table}"
    );

    db.connection()
        .call(move |conn| {
            conn.query_row(&sql, [], |row| {
                Ok(QueueStats {
                    channel,
                    pending: row.get::<_, i64>(0)? as u64,
                    claimed: row.get::<_, i64>(1)? as u64,
                    sending: row.get::<_, i64>(2)? as u64,
                    agents: row.get::<_, i64>(3)? as u64,
                    oldest_pending: row.get(4)?,
                })
            })
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Attachment, PushKeys, PushSubscription};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn agent(name: &str) -> AgentId {
        AgentId(name.to_string())
    }

    fn email(to: &str) -> NewQueueItem {
        NewQueueItem::new(
            format!("<p>hello {to}</p>"),
            ChannelPayload::Email(EmailFields {
                recipient: to.to_string(),
                subject: Some("Welcome".into()),
                ..Default::default()
            }),
        )
    }

    fn push(endpoint: &str) -> NewQueueItem {
        NewQueueItem::new(
            "ping",
            ChannelPayload::Push(PushFields {
                subscriptions: Some(vec![PushSubscription {
                    endpoint: endpoint.to_string(),
                    keys: PushKeys {
                        p256dh: "p256".into(),
                        auth: "auth".into(),
                    },
                }]),
            }),
        )
    }

    async fn raw_status(db: &Database, table: &'static str, id: i64) -> (Option<String>, String) {
        let sql = format!("SELECT agent_id, status FROM {table} WHERE id = ?1");
        db.connection()
            .call(move |conn| -> Result<(Option<String>, String), rusqlite::Error> {
                conn.query_row(&sql, params![id], |row| Ok((row.get(0)?, row.get(1)?)))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enqueue_starts_unclaimed_and_pending() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, &email("a@example.com").with_dispatch_id("d-1"))
            .await
            .unwrap();
        assert!(id > 0);

        let (agent_id, status) = raw_status(&db, "email_queue", id).await;
        assert!(agent_id.is_none());
        assert_eq!(status, "pending");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_orders_by_priority_then_age() {
        let (db, _dir) = setup_db().await;

        let first = enqueue(&db, &email("first@example.com")).await.unwrap();
        let urgent = enqueue(&db, &email("urgent@example.com").with_priority(5))
            .await
            .unwrap();
        let _last = enqueue(&db, &email("last@example.com")).await.unwrap();

        let run = agent("run-1");
        let claimed = claim(&db, Channel::Email, &run, 2).await.unwrap();
        assert_eq!(claimed, 2);

        let items = fetch_claimed(&db, Channel::Email, &run, 2).await.unwrap();
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![urgent, first]);
        assert!(items.iter().all(|i| i.agent_id.as_ref() == Some(&run)));
        assert!(items.iter().all(|i| i.status == QueueStatus::Pending));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claimed_rows_are_invisible_to_later_claims() {
        let (db, _dir) = setup_db().await;
        for n in 0..3 {
            enqueue(&db, &email(&format!("{n}@example.com"))).await.unwrap();
        }

        assert_eq!(claim(&db, Channel::Email, &agent("a"), 2).await.unwrap(), 2);
        assert_eq!(claim(&db, Channel::Email, &agent("b"), 2).await.unwrap(), 1);
        assert_eq!(claim(&db, Channel::Email, &agent("c"), 2).await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn channels_do_not_share_rows() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &email("a@example.com")).await.unwrap();

        assert_eq!(claim(&db, Channel::Sms, &agent("a"), 10).await.unwrap(), 0);
        assert_eq!(claim(&db, Channel::Push, &agent("a"), 10).await.unwrap(), 0);
        assert_eq!(claim(&db, Channel::Email, &agent("a"), 10).await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_hydrates_email_fields() {
        let (db, _dir) = setup_db().await;
        let item = NewQueueItem::new(
            "<p>invoice</p>",
            ChannelPayload::Email(EmailFields {
                recipient: "billing@example.com".into(),
                from: Some("noreply@example.com".into()),
                from_name: Some("Billing".into()),
                subject: Some("Invoice".into()),
                unsubscribe_url: Some("https://example.com/unsub".into()),
                attachments: Some(vec![Attachment {
                    filename: "invoice.pdf".into(),
                    content_type: "application/pdf".into(),
                    content_base64: "JVBERi0=".into(),
                }]),
            }),
        )
        .with_dispatch_id("dispatch-9");
        enqueue(&db, &item).await.unwrap();

        let run = agent("run");
        claim(&db, Channel::Email, &run, 10).await.unwrap();
        let items = fetch_claimed(&db, Channel::Email, &run, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].dispatch_id.as_deref(), Some("dispatch-9"));
        assert_eq!(items[0].message, "<p>invoice</p>");
        assert_eq!(items[0].payload, item.payload);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_subscriptions_decode_to_none() {
        let (db, _dir) = setup_db().await;
        let good = enqueue(&db, &push("https://push.example/good")).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO push_queue (message, subscriptions) VALUES ('x', 'a:1:{i:0;')",
                    [],
                )?;
                conn.execute(
                    "INSERT INTO push_queue (message, subscriptions) VALUES ('y', '[]')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let run = agent("run");
        assert_eq!(claim(&db, Channel::Push, &run, 10).await.unwrap(), 3);
        let items = fetch_claimed(&db, Channel::Push, &run, 10).await.unwrap();
        assert_eq!(items.len(), 3);

        for item in items {
            let ChannelPayload::Push(fields) = item.payload else {
                panic!("push table returned a non-push payload");
            };
            if item.id == good {
                assert_eq!(fields.subscriptions.unwrap().len(), 1);
            } else {
                assert!(fields.subscriptions.is_none());
            }
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_status_is_scoped_to_agent() {
        let (db, _dir) = setup_db().await;
        let mine = enqueue(&db, &email("mine@example.com")).await.unwrap();
        let theirs = enqueue(&db, &email("theirs@example.com")).await.unwrap();

        claim(&db, Channel::Email, &agent("mine"), 1).await.unwrap();
        claim(&db, Channel::Email, &agent("theirs"), 1).await.unwrap();

        assert!(
            mark_status(&db, Channel::Email, &agent("mine"), QueueStatus::Sending)
                .await
                .unwrap()
        );
        assert_eq!(raw_status(&db, "email_queue", mine).await.1, "sending");
        assert_eq!(raw_status(&db, "email_queue", theirs).await.1, "pending");

        assert!(
            !mark_status(&db, Channel::Email, &agent("nobody"), QueueStatus::Sending)
                .await
                .unwrap()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_claimed_removes_only_own_rows() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &email("a@example.com")).await.unwrap();
        enqueue(&db, &email("b@example.com")).await.unwrap();
        let unclaimed = enqueue(&db, &email("c@example.com")).await.unwrap();

        claim(&db, Channel::Email, &agent("run"), 2).await.unwrap();
        assert!(delete_claimed(&db, Channel::Email, &agent("run")).await.unwrap());
        assert!(!delete_claimed(&db, Channel::Email, &agent("run")).await.unwrap());

        let remaining = stats(&db, Channel::Email).await.unwrap();
        assert_eq!(remaining.pending, 1);
        assert_eq!(raw_status(&db, "email_queue", unclaimed).await.1, "pending");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_item_requires_the_claim() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, &email("a@example.com")).await.unwrap();

        assert!(!delete_item(&db, Channel::Email, &agent("run"), id).await.unwrap());
        claim(&db, Channel::Email, &agent("run"), 1).await.unwrap();
        assert!(!delete_item(&db, Channel::Email, &agent("other"), id).await.unwrap());
        assert!(delete_item(&db, Channel::Email, &agent("run"), id).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_by_agent_returns_rows_to_pending() {
        let (db, _dir) = setup_db().await;
        let stuck = enqueue(&db, &email("a@example.com")).await.unwrap();
        let other = enqueue(&db, &email("b@example.com")).await.unwrap();

        claim(&db, Channel::Email, &agent("stuck"), 1).await.unwrap();
        mark_status(&db, Channel::Email, &agent("stuck"), QueueStatus::Sending)
            .await
            .unwrap();
        claim(&db, Channel::Email, &agent("live"), 1).await.unwrap();

        let released = release(&db, Channel::Email, &ReleaseFilter::Agent(agent("stuck")))
            .await
            .unwrap();
        assert_eq!(released, 1);
        assert_eq!(raw_status(&db, "email_queue", stuck).await, (None, "pending".into()));
        assert_eq!(raw_status(&db, "email_queue", other).await.0.as_deref(), Some("live"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_idle_skips_recent_claims() {
        let (db, _dir) = setup_db().await;
        let old = enqueue(&db, &email("old@example.com")).await.unwrap();
        let recent = enqueue(&db, &email("recent@example.com")).await.unwrap();
        claim(&db, Channel::Email, &agent("run"), 2).await.unwrap();
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE email_queue SET updated_at = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![old],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let idle = ReleaseFilter::IdleFor(std::time::Duration::from_secs(3600));
        assert_eq!(release(&db, Channel::Email, &idle).await.unwrap(), 1);
        assert!(raw_status(&db, "email_queue", old).await.0.is_none());
        assert!(raw_status(&db, "email_queue", recent).await.0.is_some());

        assert_eq!(release(&db, Channel::Email, &ReleaseFilter::All).await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stats_counts_each_state() {
        let (db, _dir) = setup_db().await;
        for n in 0..4 {
            enqueue(&db, &email(&format!("{n}@example.com"))).await.unwrap();
        }
        claim(&db, Channel::Email, &agent("stalled"), 2).await.unwrap();
        mark_status(&db, Channel::Email, &agent("stalled"), QueueStatus::Sending)
            .await
            .unwrap();
        claim(&db, Channel::Email, &agent("claiming"), 1).await.unwrap();

        let s = stats(&db, Channel::Email).await.unwrap();
        assert_eq!(s.channel, Channel::Email);
        assert_eq!(s.pending, 1);
        assert_eq!(s.claimed, 1);
        assert_eq!(s.sending, 2);
        assert_eq!(s.agents, 2);
        assert!(s.oldest_pending.is_some());

        let empty = stats(&db, Channel::Sms).await.unwrap();
        assert_eq!(empty.pending, 0);
        assert!(empty.oldest_pending.is_none());

        db.close().await.unwrap();
    }
}
