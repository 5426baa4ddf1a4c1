//! Memory statistics sources.
//!
//! The memory monitor and the CLI snapshot lines both read free/total
//! bytes through the [`MemoryStats`] trait so that tests can drive the
//! pause/resume machinery with a deterministic fake instead of real host
//! memory.
//!
//! The production implementation is backed by `sysinfo`. Host scope maps
//! to available/total physical memory. Process scope has no native
//! equivalent of a managed heap's free/total split, so it reports the
//! allocation headroom (host available) as free and `RSS + headroom` as
//! total; the CLI snapshot then reads as "what this process could still
//! take, out of what it could grow to".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use sysinfo::{MemoryRefreshKind, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

/// Which memory pool a query refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryScope {
    /// This process: RSS plus remaining headroom.
    Process,
    /// The whole host: physical memory.
    Host,
}

/// Source of free/total byte counts for a memory scope.
///
/// Implementations must be cheap enough to poll every 250 ms.
pub trait MemoryStats: Send + Sync {
    /// Free bytes in `scope` right now.
    fn free(&self, scope: MemoryScope) -> u64;

    /// Total bytes in `scope` right now.
    fn total(&self, scope: MemoryScope) -> u64;
}

/// `sysinfo`-backed memory source.
///
/// Keeps one `System` behind a mutex and refreshes only the pieces each
/// query needs; a memory refresh is a handful of syscalls, well within
/// the monitor's poll budget.
pub struct SystemMemory {
    system: Mutex<System>,
}

impl SystemMemory {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            system: Mutex::new(system),
        }
    }

    fn refreshed_host(&self) -> (u64, u64) {
        let mut sys = self.system.lock().expect("memstats mutex poisoned");
        sys.refresh_memory();
        (sys.available_memory(), sys.total_memory())
    }

    /// Resident set size of the current process, zero if unavailable.
    fn process_rss(&self) -> u64 {
        let Ok(pid) = sysinfo::get_current_pid() else {
            return 0;
        };
        let mut sys = self.system.lock().expect("memstats mutex poisoned");
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        sys.process(pid).map_or(0, |p| p.memory())
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStats for SystemMemory {
    fn free(&self, scope: MemoryScope) -> u64 {
        match scope {
            MemoryScope::Host | MemoryScope::Process => self.refreshed_host().0,
        }
    }

    fn total(&self, scope: MemoryScope) -> u64 {
        match scope {
            MemoryScope::Host => self.refreshed_host().1,
            MemoryScope::Process => {
                let headroom = self.refreshed_host().0;
                self.process_rss().saturating_add(headroom)
            }
        }
    }
}

/// Deterministic memory source for tests and simulations.
///
/// `free` is adjustable at runtime so a test can push the host "below
/// the floor" and later release the pressure; `total` is fixed.
pub struct FixedMemory {
    free: AtomicU64,
    total: u64,
}

impl FixedMemory {
    pub fn new(free: u64, total: u64) -> Self {
        Self {
            free: AtomicU64::new(free),
            total,
        }
    }

    /// Changes the reported free size for every scope.
    pub fn set_free(&self, bytes: u64) {
        self.free.store(bytes, Ordering::SeqCst);
    }
}

impl MemoryStats for FixedMemory {
    fn free(&self, _scope: MemoryScope) -> u64 {
        self.free.load(Ordering::SeqCst)
    }

    fn total(&self, _scope: MemoryScope) -> u64 {
        self.total
    }
}
