// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP relay dispatch adapter.
//!
//! POSTs each [`DispatchRequest`] as JSON to `{endpoint}/{channel}` and reads
//! back `{"sent": bool}`. The relay owns SMTP, SMS provider, and web push
//! specifics. Recipient-level problems are reported as `Ok(false)`; only a
//! missing endpoint is an error.

use std::time::Duration;

use async_trait::async_trait;
use courier_config::model::DispatchConfig;
use courier_core::{CourierError, DispatchAdapter, DispatchRequest};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RelayResponse {
    sent: bool,
}

/// Dispatch adapter backed by an HTTP relay service.
#[derive(Debug, Clone)]
pub struct HttpRelayDispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRelayDispatcher {
    /// Build a dispatcher from the `[dispatch]` config section.
    ///
    /// An empty endpoint is accepted here and reported on the first send.
    pub fn new(config: &DispatchConfig) -> Result<Self, CourierError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                CourierError::Config(format!("invalid dispatch.api_key header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CourierError::Dispatch {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DispatchAdapter for HttpRelayDispatcher {
    fn name(&self) -> &str {
        "http-relay"
    }

    async fn send(&self, request: &DispatchRequest) -> Result<bool, CourierError> {
        if self.endpoint.is_empty() {
            return Err(CourierError::Config(
                "dispatch.endpoint is not configured".into(),
            ));
        }

        let channel = request.outbound.channel();
        let url = format!("{}/{channel}", self.endpoint);
        let response = match self.client.post(&url).json(request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%channel, item_id = request.item_id, error = %e, "relay request failed");
                return Ok(false);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%channel, item_id = request.item_id, status = %status, body = %body, "relay rejected item");
            return Ok(false);
        }

        match response.json::<RelayResponse>().await {
            Ok(body) => {
                debug!(%channel, item_id = request.item_id, sent = body.sent, "relay answered");
                Ok(body.sent)
            }
            Err(e) => {
                warn!(%channel, item_id = request.item_id, error = %e, "unreadable relay response");
                Ok(false)
            }
        }
    }
}
