//! Memory backpressure for the state-space limit check.

use memory_stats::memory_stats;
use tracing::debug;

use crate::config::SearchConfig;

/// Source of "how much memory is left" for the search.
pub trait MemoryProbe {
    /// Bytes still available, or `None` when unknown (treated as unlimited).
    fn available(&self) -> Option<u64>;

    /// Ask the owner of the heap to give memory back before the search gives up.
    fn reclaim(&mut self);

    /// Pick up thresholds from a (re)applied configuration.
    fn configure(&mut self, _config: &SearchConfig) {}
}

/// Derives available memory from the process's physical footprint and a ceiling.
#[derive(Debug, Clone, Default)]
pub struct ProcessMemory {
    ceiling: Option<u64>,
    reclaims: u64,
}

impl ProcessMemory {
    pub fn new(ceiling: Option<u64>) -> Self {
        Self {
            ceiling,
            reclaims: 0,
        }
    }

    pub fn reclaims(&self) -> u64 {
        self.reclaims
    }
}

impl MemoryProbe for ProcessMemory {
    fn available(&self) -> Option<u64> {
        let ceiling = self.ceiling?;
        let used = memory_stats()?.physical_mem as u64;
        Some(ceiling.saturating_sub(used))
    }

    fn reclaim(&mut self) {
        // Nothing to collect in-process; freed allocations are already returned.
        self.reclaims += 1;
        debug!(reclaims = self.reclaims, "memory reclaim requested");
    }

    fn configure(&mut self, config: &SearchConfig) {
        self.ceiling = config.max_memory.map(|size| size.as_bytes());
    }
}
