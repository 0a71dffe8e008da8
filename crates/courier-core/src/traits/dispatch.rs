// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel dispatch adapter trait.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::DispatchRequest;

/// Performs the network send for one normalized queue item.
///
/// `Ok(true)` means the transport accepted the item, `Ok(false)` a
/// recipient-level failure. `Err` is reserved for adapter-level problems
/// such as missing credentials; the engine counts both as a failed item.
#[async_trait]
pub trait DispatchAdapter: Send + Sync {
    /// Human-readable adapter name, used in logs.
    fn name(&self) -> &str;

    /// Sends one item.
    async fn send(&self, request: &DispatchRequest) -> Result<bool, CourierError>;
}
