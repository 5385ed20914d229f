//! Search statistics.
//!
//! Counters updated by a listener as the search runs. The reporter reads them at
//! probe and finish time.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::listener::{ListenerResult, SearchListener};
use crate::search::SearchRun;

/// Counters collected over one search run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// States the search advanced into that were new.
    pub new_states: u64,
    /// States the search advanced into that had been seen before.
    pub visited_states: u64,
    /// End states reached.
    pub end_states: u64,
    pub backtracked: u64,
    pub processed: u64,
    pub restored: u64,
    pub stored: u64,
    pub constraints: u64,
    pub violations: u64,
    pub probes: u64,
    /// Depth after the most recent event.
    pub depth: usize,
    pub max_depth: usize,
    /// Wall-clock seconds since `searchStarted`, refreshed on probe and finish.
    pub elapsed_secs: f64,
}

impl SearchStats {
    /// Total forward steps observed.
    pub fn transitions(&self) -> u64 {
        self.new_states + self.visited_states
    }
}

/// Listener that keeps a `SearchStats` up to date.
#[derive(Debug, Default)]
pub struct Statistics {
    stats: SearchStats,
    started: Option<Instant>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    fn track_depth(&mut self, run: &SearchRun) {
        self.stats.depth = run.depth();
        self.stats.max_depth = self.stats.max_depth.max(run.depth());
    }

    fn refresh_elapsed(&mut self) {
        if let Some(started) = self.started {
            self.stats.elapsed_secs = started.elapsed().as_secs_f64();
        }
    }
}

impl SearchListener for Statistics {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn search_started(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.stats = SearchStats::default();
        self.started = Some(Instant::now());
        self.track_depth(run);
        Ok(())
    }

    fn state_advanced(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.track_depth(run);
        if run.is_new_state()? {
            self.stats.new_states += 1;
        } else {
            self.stats.visited_states += 1;
        }
        if run.is_end_state() {
            self.stats.end_states += 1;
        }
        Ok(())
    }

    fn state_processed(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.stats.processed += 1;
        Ok(())
    }

    fn state_backtracked(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.stats.backtracked += 1;
        self.track_depth(run);
        Ok(())
    }

    fn state_stored(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.stats.stored += 1;
        Ok(())
    }

    fn state_restored(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.stats.restored += 1;
        self.track_depth(run);
        Ok(())
    }

    fn property_violated(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.stats.violations += 1;
        Ok(())
    }

    fn search_constraint_hit(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.stats.constraints += 1;
        Ok(())
    }

    fn search_probed(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.stats.probes += 1;
        self.refresh_elapsed();
        Ok(())
    }

    fn search_finished(&mut self, run: &mut SearchRun) -> ListenerResult {
        self.track_depth(run);
        self.refresh_elapsed();
        Ok(())
    }
}
