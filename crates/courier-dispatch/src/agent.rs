// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run-scoped agent identifiers.

use courier_core::AgentId;

/// Generate a fresh agent id: `<UTC yyyymmddHHMMSS>-<uuid v4 simple>`.
///
/// The timestamp prefix keeps stalled claims sortable by age in the table;
/// the v4 suffix carries 122 random bits.
pub fn generate() -> AgentId {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    AgentId(format!("{stamp}-{}", uuid::Uuid::new_v4().simple()))
}
