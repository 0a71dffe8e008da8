// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock benchmark around a worker run. Purely observational.

use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone)]
pub struct Benchmark {
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

impl Benchmark {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a monotonic start time, discarding any previous measurement.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.elapsed = None;
    }

    /// Record elapsed time since `start`. Returns zero if never started.
    pub fn stop(&mut self) -> Duration {
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        self.elapsed = Some(elapsed);
        elapsed
    }

    /// The stopped measurement, or the running time if still in progress.
    pub fn elapsed(&self) -> Duration {
        match (self.elapsed, self.started) {
            (Some(elapsed), _) => elapsed,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some() && self.elapsed.is_none()
    }
}
