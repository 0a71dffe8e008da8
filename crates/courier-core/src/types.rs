// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue item types shared by the store, the engine, and dispatch adapters.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CourierError;

/// A transport channel. Each channel has its own queue table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Push,
}

impl Channel {
    /// All channels, in the order operator commands report them.
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Push];

    /// Name of the backing queue table.
    pub fn table(&self) -> &'static str {
        match self {
            Channel::Email => "email_queue",
            Channel::Sms => "sms_queue",
            Channel::Push => "push_queue",
        }
    }
}

/// Row status. The engine only ever writes these two; a sent row is deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Sending,
}

/// Run-scoped claim token stamped on queue rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One email attachment, as stored in the `attachments` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    /// File bytes, base64-encoded.
    pub content_base64: String,
}

/// Web push encryption keys for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// One browser push endpoint, as stored in the `subscriptions` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}

/// Email-specific columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailFields {
    pub recipient: String,
    pub from: Option<String>,
    pub from_name: Option<String>,
    pub subject: Option<String>,
    pub unsubscribe_url: Option<String>,
    pub attachments: Option<Vec<Attachment>>,
}

/// SMS-specific columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsFields {
    pub recipient: String,
    /// Provider session identifier. Empty means "use the configured default".
    pub session: Option<String>,
}

/// Push-specific columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFields {
    pub subscriptions: Option<Vec<PushSubscription>>,
}

/// Channel-specific part of a queue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelPayload {
    Email(EmailFields),
    Sms(SmsFields),
    Push(PushFields),
}

impl ChannelPayload {
    pub fn channel(&self) -> Channel {
        match self {
            ChannelPayload::Email(_) => Channel::Email,
            ChannelPayload::Sms(_) => Channel::Sms,
            ChannelPayload::Push(_) => Channel::Push,
        }
    }
}

/// A persisted queue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub agent_id: Option<AgentId>,
    /// Opaque correlation id supplied by the enqueuing caller.
    pub dispatch_id: Option<String>,
    /// Pre-rendered body.
    pub message: String,
    pub priority: i32,
    pub status: QueueStatus,
    pub payload: ChannelPayload,
}

impl QueueItem {
    pub fn channel(&self) -> Channel {
        self.payload.channel()
    }
}

/// Input for enqueueing a new row. The store assigns id, timestamps, and
/// always starts the row unclaimed at `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueItem {
    pub dispatch_id: Option<String>,
    pub message: String,
    pub priority: i32,
    pub payload: ChannelPayload,
}

impl NewQueueItem {
    pub fn new(message: impl Into<String>, payload: ChannelPayload) -> Self {
        Self {
            dispatch_id: None,
            message: message.into(),
            priority: 0,
            payload,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dispatch_id(mut self, dispatch_id: impl Into<String>) -> Self {
        self.dispatch_id = Some(dispatch_id.into());
        self
    }
}

// --- Adapter input ---

/// Email as handed to a dispatch adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub from: Option<String>,
    pub from_name: Option<String>,
    pub subject: Option<String>,
    /// The compiled template.
    pub body: String,
    pub unsubscribe_url: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// SMS as handed to a dispatch adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundSms {
    pub to: String,
    pub session: String,
    pub message: String,
}

/// Push notification as handed to a dispatch adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundPush {
    pub subscriptions: Vec<PushSubscription>,
    pub message: String,
}

/// Normalized, channel-specific adapter payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outbound {
    Email(OutboundEmail),
    Sms(OutboundSms),
    Push(OutboundPush),
}

impl Outbound {
    pub fn channel(&self) -> Channel {
        match self {
            Outbound::Email(_) => Channel::Email,
            Outbound::Sms(_) => Channel::Sms,
            Outbound::Push(_) => Channel::Push,
        }
    }
}

/// One send request: the normalized payload plus correlation ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub item_id: i64,
    pub dispatch_id: Option<String>,
    pub outbound: Outbound,
}

// --- Blob codec ---

/// Encodes a structured blob column as JSON.
pub fn encode_blob<T: Serialize>(field: &str, value: &T) -> Result<String, CourierError> {
    serde_json::to_string(value).map_err(|e| CourierError::Payload {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Decodes a structured blob column.
///
/// `None`, empty, and whitespace-only input decode to `Ok(None)`; malformed
/// input is an error the caller is expected to downgrade.
pub fn decode_blob<T: DeserializeOwned>(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<T>, CourierError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|e| CourierError::Payload {
            field: field.to_string(),
            message: e.to_string(),
        })
}
