use crate::error::SearchResult;
use crate::search::{Search, StopReason};

use super::SearchStrategy;

/// Systematic depth-first search with backtracking.
///
/// Every iteration first decides whether the current state must be left (pending
/// backtrack request, revisited, end, ignored, or the depth limit was just hit) and
/// backtracks if so; then it tries to advance. The search is exhausted when a
/// backtrack is needed at the root.
#[derive(Debug, Default)]
pub struct DepthFirstSearch {
    depth_limit_reached: bool,
}

impl DepthFirstSearch {
    pub fn new() -> Self {
        Self::default()
    }

    fn must_backtrack(&mut self, search: &mut Search) -> SearchResult<bool> {
        // The state is always queried so its depth is recorded for later revisits,
        // even when a backtrack request makes the answer irrelevant.
        let is_new = search.is_new_state()?;
        Ok(search.check_and_reset_backtrack_request()
            || !is_new
            || search.is_end_state()
            || search.is_ignored_state()
            || self.depth_limit_reached)
    }
}

impl SearchStrategy for DepthFirstSearch {
    fn search(&mut self, search: &mut Search) -> SearchResult<StopReason> {
        self.depth_limit_reached = false;
        search.run_state_mut().set_depth(0);
        search.notify_search_started()?;

        let mut reason = None;
        while !search.is_done() {
            search.check_and_reset_probe_request()?;

            if self.must_backtrack(search)? {
                if !search.backtrack() {
                    reason = Some(StopReason::Exhausted);
                    break;
                }
                self.depth_limit_reached = false;
                search.run_state_mut().decrement_depth();
                search.notify_state_backtracked()?;
            }

            if search.forward() {
                search.run_state_mut().increment_depth();
                search.notify_state_advanced()?;

                if search.run_state().is_error_state() {
                    search.notify_property_violated()?;
                    if search.has_property_termination() {
                        reason = Some(StopReason::PropertyViolated);
                        break;
                    }
                    // In multi-error mode a backtrack request is now pending.
                }

                let depth_limit = search.run_state().depth_limit();
                if search.depth() >= depth_limit {
                    self.depth_limit_reached = true;
                    search.notify_search_constraint_hit(format!(
                        "depth limit reached: {depth_limit}"
                    ))?;
                    continue;
                }

                if !search.check_state_space_limit() {
                    let min_free = search.config().min_free_memory;
                    search.notify_search_constraint_hit(format!(
                        "memory limit reached: {min_free}"
                    ))?;
                    reason = Some(StopReason::ConstraintHit);
                    break;
                }
            } else {
                search.notify_state_processed()?;
            }
        }

        search.notify_search_finished()?;
        Ok(reason.unwrap_or(StopReason::Terminated))
    }

    fn name(&self) -> &'static str {
        "dfs"
    }
}
