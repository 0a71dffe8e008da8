// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.
//!
//! Provides a scripted dispatch adapter and a temp-database harness for
//! fast, deterministic tests without a relay service.
//!
//! # Components
//!
//! - [`MockDispatcher`] - Scripted dispatch adapter with request capture
//! - [`TestHarness`] - Temp SQLite stores plus routine builders

pub mod harness;
pub mod mock_dispatcher;

pub use harness::TestHarness;
pub use mock_dispatcher::MockDispatcher;
