// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email, SMS, and push bindings of the generic [`QueueRoutine`].
//!
//! Each channel contributes only its normalization step; control flow is
//! shared.

use std::sync::Arc;

use courier_config::CourierConfig;
use courier_core::{
    Channel, ChannelPayload, CourierError, DispatchAdapter, Outbound, OutboundEmail, OutboundPush,
    OutboundSms, QueueItem, QueueStore,
};

use crate::routine::{Normalizer, QueueRoutine, RunOptions};

fn wrong_payload(expected: Channel, item: &QueueItem) -> CourierError {
    CourierError::Payload {
        field: "payload".into(),
        message: format!(
            "item {} carries a {} payload, expected {expected}",
            item.id,
            item.channel()
        ),
    }
}

/// Compiled template becomes the body; the recipient becomes `to`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailNormalizer;

impl Normalizer for EmailNormalizer {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn normalize(&self, item: &QueueItem) -> Result<Outbound, CourierError> {
        let ChannelPayload::Email(fields) = &item.payload else {
            return Err(wrong_payload(Channel::Email, item));
        };
        Ok(Outbound::Email(OutboundEmail {
            to: fields.recipient.clone(),
            from: fields.from.clone(),
            from_name: fields.from_name.clone(),
            subject: fields.subject.clone(),
            body: item.message.clone(),
            unsubscribe_url: fields.unsubscribe_url.clone(),
            attachments: fields.attachments.clone().unwrap_or_default(),
        }))
    }
}

/// Fills an empty stored session with the configured default.
#[derive(Debug, Default, Clone)]
pub struct SmsNormalizer {
    default_session: String,
}

impl SmsNormalizer {
    pub fn new(default_session: impl Into<String>) -> Self {
        Self {
            default_session: default_session.into(),
        }
    }
}

impl Normalizer for SmsNormalizer {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn normalize(&self, item: &QueueItem) -> Result<Outbound, CourierError> {
        let ChannelPayload::Sms(fields) = &item.payload else {
            return Err(wrong_payload(Channel::Sms, item));
        };
        let session = fields
            .session
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_session);
        Ok(Outbound::Sms(OutboundSms {
            to: fields.recipient.clone(),
            session: session.to_string(),
            message: item.message.clone(),
        }))
    }
}

/// Decoded subscriptions plus the message. Undecodable subscriptions were
/// already downgraded to none by the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct PushNormalizer;

impl Normalizer for PushNormalizer {
    fn channel(&self) -> Channel {
        Channel::Push
    }

    fn normalize(&self, item: &QueueItem) -> Result<Outbound, CourierError> {
        let ChannelPayload::Push(fields) = &item.payload else {
            return Err(wrong_payload(Channel::Push, item));
        };
        Ok(Outbound::Push(OutboundPush {
            subscriptions: fields.subscriptions.clone().unwrap_or_default(),
            message: item.message.clone(),
        }))
    }
}

/// The normalizer for `channel`, configured from `config`.
pub fn normalizer_for(channel: Channel, config: &CourierConfig) -> Box<dyn Normalizer> {
    match channel {
        Channel::Email => Box::new(EmailNormalizer),
        Channel::Sms => Box::new(SmsNormalizer::new(config.sms.default_session.clone())),
        Channel::Push => Box::new(PushNormalizer),
    }
}

/// Build the routine for the store's channel using `config` for batch size,
/// commit mode, and channel defaults. `batch_size` overrides the configured
/// value when given.
pub fn routine_for(
    store: Arc<dyn QueueStore>,
    adapter: Arc<dyn DispatchAdapter>,
    config: &CourierConfig,
    batch_size: Option<u32>,
) -> Result<QueueRoutine, CourierError> {
    let options = RunOptions {
        batch_size: batch_size.unwrap_or(config.queue.batch_size),
        commit_mode: config.queue.commit_mode,
    };
    if options.batch_size == 0 {
        return Err(CourierError::Config("batch size must be at least 1".into()));
    }
    let normalizer = normalizer_for(store.channel(), config);
    QueueRoutine::new(store, adapter, normalizer, options)
}
