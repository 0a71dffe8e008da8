// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch engine for the Courier queue.
//!
//! - [`QueueRoutine`]: claims a batch under a fresh agent id, marks it
//!   `sending`, sends every item once, then commits or stalls the batch.
//! - [`routines`]: email, SMS, and push normalization bound to the engine.
//! - [`AutomationProcess`]: CLI-only guard, time and memory ceilings, and
//!   the run benchmark.
//! - [`HttpRelayDispatcher`]: the production [`DispatchAdapter`](courier_core::DispatchAdapter).

pub mod agent;
pub mod benchmark;
pub mod http;
pub mod process;
pub mod routine;
pub mod routines;

pub use benchmark::Benchmark;
pub use http::HttpRelayDispatcher;
pub use process::{AutomationProcess, InvocationContext, MemoryProbe, NoMemoryProbe, ResourceLimits};
pub use routine::{Normalizer, QueueRoutine, RunOptions, RunOutcome, RunReport};
pub use routines::{EmailNormalizer, PushNormalizer, SmsNormalizer, normalizer_for, routine_for};
