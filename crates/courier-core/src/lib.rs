// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier dispatch queue.
//!
//! This crate provides the queue item model, the error type, and the two
//! boundary traits the engine is written against: [`QueueStore`] for the
//! per-channel tables and [`DispatchAdapter`] for the transports.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CourierError;
pub use traits::{DispatchAdapter, QueueStore};
pub use types::{
    AgentId, Attachment, Channel, ChannelPayload, DispatchRequest, EmailFields, NewQueueItem,
    Outbound, OutboundEmail, OutboundPush, OutboundSms, PushFields, PushKeys, PushSubscription,
    QueueItem, QueueStatus, SmsFields,
};
