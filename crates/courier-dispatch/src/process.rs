// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automation process supervisor.
//!
//! Wraps a unit of queue work with the invocation-origin guard, a wall-clock
//! deadline, a memory watchdog, and a benchmark. A breached ceiling drops the
//! in-flight work future; rows it had claimed stay claimed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use courier_config::model::ProcessConfig;
use courier_core::CourierError;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

use crate::benchmark::Benchmark;

/// Where the process was started from. Only `Cli` may run queue work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum InvocationContext {
    Cli,
    #[default]
    Http,
}

/// Process-wide ceilings applied around a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub memory_limit_bytes: u64,
    pub time_limit: Duration,
    /// How often the memory watchdog samples the probe.
    pub poll_interval: Duration,
}

impl ResourceLimits {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

    pub fn from_config(config: &ProcessConfig) -> Self {
        Self {
            memory_limit_bytes: config.memory_limit_bytes,
            time_limit: Duration::from_secs(config.time_limit_secs),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::from_config(&ProcessConfig::default())
    }
}

/// Source of the process's current allocated-bytes figure.
pub trait MemoryProbe: Send + Sync {
    /// Currently allocated bytes, or `None` when unavailable.
    fn allocated_bytes(&self) -> Option<u64>;
}

/// Probe for builds without an allocator that reports statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMemoryProbe;

impl MemoryProbe for NoMemoryProbe {
    fn allocated_bytes(&self) -> Option<u64> {
        None
    }
}

/// Supervisor for one worker invocation.
pub struct AutomationProcess {
    context: InvocationContext,
    limits: ResourceLimits,
    db_caching: bool,
    probe: Arc<dyn MemoryProbe>,
    benchmark: Benchmark,
}

impl AutomationProcess {
    pub fn new(context: InvocationContext, limits: ResourceLimits) -> Self {
        Self {
            context,
            limits,
            db_caching: true,
            probe: Arc::new(NoMemoryProbe),
            benchmark: Benchmark::new(),
        }
    }

    pub fn from_config(context: InvocationContext, config: &ProcessConfig) -> Self {
        Self::new(context, ResourceLimits::from_config(config)).with_db_caching(config.db_caching)
    }

    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_db_caching(mut self, enabled: bool) -> Self {
        self.db_caching = enabled;
        self
    }

    pub fn context(&self) -> InvocationContext {
        self.context
    }

    pub fn limits(&self) -> ResourceLimits {
        self.limits
    }

    /// Whether stores opened for this run should keep one connection.
    pub fn db_caching(&self) -> bool {
        self.db_caching
    }

    pub fn benchmark(&self) -> &Benchmark {
        &self.benchmark
    }

    /// Reject anything not started from the command line.
    pub fn ensure_cli(&self) -> Result<(), CourierError> {
        match self.context {
            InvocationContext::Cli => Ok(()),
            other => {
                warn!(origin = %other, "refusing queue work outside a CLI invocation");
                Err(CourierError::Forbidden {
                    origin: other.to_string(),
                })
            }
        }
    }

    /// Run `work` under the origin guard and resource ceilings.
    ///
    /// The guard is checked before `work` is polled. The benchmark covers
    /// the supervised section only.
    pub async fn run<F, T>(&mut self, work: F) -> Result<T, CourierError>
    where
        F: Future<Output = T>,
    {
        self.ensure_cli()?;

        let cancel = CancellationToken::new();
        let (breach_tx, mut breach_rx) = oneshot::channel();
        tokio::spawn(
            memory_watchdog(
                self.probe.clone(),
                self.limits.memory_limit_bytes,
                self.limits.poll_interval,
                breach_tx,
                cancel.clone(),
            )
            .in_current_span(),
        );

        self.benchmark.start();
        let time_limit = self.limits.time_limit;
        let result = tokio::select! {
            finished = tokio::time::timeout(time_limit, work) => finished.map_err(|_| {
                warn!(time_limit_secs = time_limit.as_secs(), "run exceeded its time limit, aborting");
                CourierError::Timeout { duration: time_limit }
            }),
            Ok(breach) = &mut breach_rx => Err(breach),
        };
        let elapsed = self.benchmark.stop();
        cancel.cancel();

        debug!(elapsed_ms = elapsed.as_millis() as u64, ok = result.is_ok(), "supervised run ended");
        result
    }
}

/// Sample `probe` every `interval` until cancelled. Sends the breach error
/// and exits the first time allocation exceeds `limit`.
async fn memory_watchdog(
    probe: Arc<dyn MemoryProbe>,
    limit: u64,
    interval: Duration,
    breach: oneshot::Sender<CourierError>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(allocated) = probe.allocated_bytes() else {
                    continue;
                };
                if allocated > limit {
                    warn!(
                        allocated_mb = allocated / (1024 * 1024),
                        limit_mb = limit / (1024 * 1024),
                        "memory ceiling exceeded, aborting run"
                    );
                    let _ = breach.send(CourierError::ResourceLimit {
                        resource: "memory".into(),
                        limit,
                        observed: allocated,
                    });
                    return;
                }
            }
            _ = cancel.cancelled() => {
                debug!("memory watchdog stopped");
                return;
            }
        }
    }
}
