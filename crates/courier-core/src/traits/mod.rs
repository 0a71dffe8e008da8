// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary traits for the dispatch queue.
//!
//! The engine only talks to persistence through [`QueueStore`] and to the
//! network through [`DispatchAdapter`]. Both use `#[async_trait]` so they can
//! be held as trait objects.

pub mod dispatch;
pub mod store;

pub use dispatch::DispatchAdapter;
pub use store::QueueStore;
