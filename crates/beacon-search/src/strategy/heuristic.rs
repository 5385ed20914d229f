//! Best-first search over stored engine snapshots.
//!
//! All children of a parent state are generated by stepping forward, queueing the
//! child and backtracking to the parent again. The best queued child is then
//! restored and becomes the next parent.

use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{SearchError, SearchResult};
use crate::search::{Search, SearchRun, StopReason};
use crate::vm::{StateId, VmSnapshot};

use super::SearchStrategy;

/// Priority of a state about to be queued. Lower values are expanded first.
pub trait Heuristic {
    fn priority(&mut self, run: &SearchRun) -> i64;

    fn name(&self) -> &'static str;
}

/// Shallow states first.
#[derive(Debug, Default, Clone, Copy)]
pub struct BreadthFirst;

impl Heuristic for BreadthFirst {
    fn priority(&mut self, run: &SearchRun) -> i64 {
        run.depth() as i64
    }

    fn name(&self) -> &'static str {
        "breadth_first"
    }
}

/// Deep states first.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeepestFirst;

impl Heuristic for DeepestFirst {
    fn priority(&mut self, run: &SearchRun) -> i64 {
        -(run.depth() as i64)
    }

    fn name(&self) -> &'static str {
        "deepest_first"
    }
}

/// Seeded random order.
#[derive(Debug, Clone)]
pub struct RandomPriority {
    rng: ChaCha8Rng,
}

impl RandomPriority {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }
}

impl Heuristic for RandomPriority {
    fn priority(&mut self, _run: &SearchRun) -> i64 {
        self.rng.gen_range(0..i64::from(u32::MAX))
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

#[derive(Debug)]
struct QueuedState {
    snapshot: VmSnapshot,
    state_id: StateId,
}

/// Queue-driven search ordered by a `Heuristic`.
///
/// Ties are broken by insertion order. When the configured queue limit is reached
/// the worst entry is evicted if the new state beats it; otherwise the new state
/// is dropped.
#[derive(Debug)]
pub struct HeuristicSearch<H> {
    heuristic: H,
    queue: BTreeMap<(i64, u64), QueuedState>,
    next_seq: u64,
    stored: usize,
}

impl<H: Heuristic> HeuristicSearch<H> {
    pub fn new(heuristic: H) -> Self {
        Self {
            heuristic,
            queue: BTreeMap::new(),
            next_seq: 0,
            stored: 0,
        }
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    /// States queued during the last `search`.
    pub fn stored_states(&self) -> usize {
        self.stored
    }

    fn is_queue_limit_reached(&self, search: &Search) -> bool {
        search
            .config()
            .queue_limit
            .is_some_and(|limit| self.queue.len() >= limit)
    }

    /// Queue the current state. `false` if it lost against a full queue.
    fn queue_current_state(&mut self, search: &Search) -> SearchResult<bool> {
        let run = search.run_state();
        let snapshot = run.vm().restorable_state().ok_or(SearchError::Unsupported {
            strategy: "heuristic",
            capability: "restorable snapshots",
        })?;
        let key = (self.heuristic.priority(run), self.next_seq);
        self.next_seq += 1;

        if self.is_queue_limit_reached(search) {
            match self.queue.last_key_value() {
                Some((worst, _)) if key < *worst => {
                    self.queue.pop_last();
                }
                _ => return Ok(false),
            }
        }

        self.queue.insert(
            key,
            QueuedState {
                snapshot,
                state_id: run.state_id(),
            },
        );
        self.stored += 1;
        Ok(true)
    }

    /// Expand the current state. `Some` when the search must stop.
    fn generate_children(&mut self, search: &mut Search) -> SearchResult<Option<StopReason>> {
        while !search.is_done() {
            search.check_and_reset_probe_request()?;

            if !search.forward() {
                search.notify_state_processed()?;
                return Ok(None);
            }
            search.run_state_mut().increment_depth();
            search.notify_state_advanced()?;

            if search.run_state().is_error_state() {
                // Recorded so a later revisit on a clean path has a depth to compare.
                search.is_new_state()?;
                search.notify_property_violated()?;
                if search.has_property_termination() {
                    return Ok(Some(StopReason::PropertyViolated));
                }
                // We return to the parent anyway.
                search.check_and_reset_backtrack_request();
            } else if !search.is_end_state() && !search.is_ignored_state() {
                let is_new = search.is_new_state()?;
                let depth_limit = search.run_state().depth_limit();
                if is_new && search.depth() >= depth_limit {
                    search.notify_search_constraint_hit(format!(
                        "depth limit reached: {depth_limit}"
                    ))?;
                } else if is_new || search.config().path_sensitive {
                    if self.is_queue_limit_reached(search) {
                        let size = self.queue.len();
                        search.notify_search_constraint_hit(format!(
                            "queue limit reached: {size}"
                        ))?;
                    }
                    if self.queue_current_state(search)? {
                        search.notify_state_stored()?;
                    }
                }
            }

            if !search.check_state_space_limit() {
                let min_free = search.config().min_free_memory;
                search.notify_search_constraint_hit(format!(
                    "memory limit reached: {min_free}"
                ))?;
                return Ok(Some(StopReason::ConstraintHit));
            }

            if !search.backtrack() {
                return Ok(Some(StopReason::Exhausted));
            }
            search.run_state_mut().decrement_depth();
            search.notify_state_backtracked()?;
        }
        Ok(None)
    }
}

impl<H: Heuristic> SearchStrategy for HeuristicSearch<H> {
    fn search(&mut self, search: &mut Search) -> SearchResult<StopReason> {
        self.queue.clear();
        self.next_seq = 0;
        self.stored = 0;
        let root_depth = search.run_state().vm().path_length();
        search.run_state_mut().set_depth(root_depth);
        search.notify_search_started()?;

        // The root is queued and immediately taken back out as the first parent.
        if self.queue_current_state(search)? {
            search.notify_state_stored()?;
        }
        self.queue.pop_first();

        let mut reason = self.generate_children(search)?;
        while reason.is_none() && !search.is_done() {
            let Some((_, parent)) = self.queue.pop_first() else {
                reason = Some(StopReason::Exhausted);
                break;
            };
            debug!(
                heuristic = self.heuristic.name(),
                state_id = parent.state_id,
                queued = self.queue.len(),
                "expanding queued state"
            );
            search.restore_state(&parent.snapshot, self.name())?;
            search.notify_state_restored()?;
            reason = self.generate_children(search)?;
        }

        search.notify_search_finished()?;
        Ok(reason.unwrap_or(StopReason::Terminated))
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn supports_backtrack(&self) -> bool {
        false
    }

    fn supports_restore_state(&self) -> bool {
        true
    }
}
