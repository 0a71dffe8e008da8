// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Allocator-backed memory probe for the process watchdog.

use std::sync::Arc;

use courier_dispatch::MemoryProbe;

/// Reads jemalloc's `stats.allocated` after advancing the stats epoch.
#[cfg(not(target_env = "msvc"))]
pub struct JemallocProbe;

#[cfg(not(target_env = "msvc"))]
impl MemoryProbe for JemallocProbe {
    fn allocated_bytes(&self) -> Option<u64> {
        tikv_jemalloc_ctl::epoch::advance().ok()?;
        tikv_jemalloc_ctl::stats::allocated::read()
            .ok()
            .map(|bytes| bytes as u64)
    }
}

/// The best probe available on this target.
pub fn probe() -> Arc<dyn MemoryProbe> {
    #[cfg(not(target_env = "msvc"))]
    {
        Arc::new(JemallocProbe)
    }
    #[cfg(target_env = "msvc")]
    {
        Arc::new(courier_dispatch::NoMemoryProbe)
    }
}
