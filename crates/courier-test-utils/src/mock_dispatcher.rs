// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock dispatch adapter for deterministic testing.
//!
//! `MockDispatcher` implements `DispatchAdapter` with a scripted queue of
//! results and captures every request it receives for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{CourierError, DispatchAdapter, DispatchRequest};

/// A scripted dispatch adapter.
///
/// Results are popped from a FIFO queue, one per `send()`. When the queue is
/// empty, the fallback result (`Ok(true)` unless changed) is returned.
pub struct MockDispatcher {
    script: Arc<Mutex<VecDeque<Result<bool, CourierError>>>>,
    requests: Arc<Mutex<Vec<DispatchRequest>>>,
    fallback: bool,
}

impl MockDispatcher {
    /// A dispatcher that reports every item as sent.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            fallback: true,
        }
    }

    /// A dispatcher that returns `results` in order, then `Ok(true)`.
    pub fn with_results(results: Vec<Result<bool, CourierError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(results))),
            ..Self::new()
        }
    }

    /// A dispatcher that reports every unscripted item as not sent.
    pub fn failing() -> Self {
        Self {
            fallback: false,
            ..Self::new()
        }
    }

    /// Append a result to the script.
    pub async fn push_result(&self, result: Result<bool, CourierError>) {
        self.script.lock().await.push_back(result);
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<DispatchRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of `send()` calls so far.
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Forget captured requests.
    pub async fn clear(&self) {
        self.requests.lock().await.clear();
    }
}

impl Default for MockDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DispatchAdapter for MockDispatcher {
    fn name(&self) -> &str {
        "mock-dispatcher"
    }

    async fn send(&self, request: &DispatchRequest) -> Result<bool, CourierError> {
        self.requests.lock().await.push(request.clone());
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }
}
