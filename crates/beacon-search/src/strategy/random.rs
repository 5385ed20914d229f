use tracing::debug;

use crate::error::{SearchError, SearchResult};
use crate::search::{Search, StopReason};

use super::SearchStrategy;

/// Repeated random walks from a fixed initial snapshot.
///
/// Each walk runs forward without state matching until an end state, a dead end or
/// the depth limit. The walk then gets one more property check, the initial snapshot
/// is restored and the engine is told to make fresh choices. Backtrack requests end
/// the current walk; there is no stepping back within a walk.
#[derive(Debug)]
pub struct RandomRestart {
    path_limit: usize,
    walks: usize,
}

impl RandomRestart {
    pub fn new(path_limit: usize) -> Self {
        Self {
            path_limit: path_limit.max(1),
            walks: 0,
        }
    }

    /// Walks completed by the last `search`.
    pub fn walks(&self) -> usize {
        self.walks
    }
}

impl SearchStrategy for RandomRestart {
    fn search(&mut self, search: &mut Search) -> SearchResult<StopReason> {
        self.walks = 0;
        let initial = search
            .run_state()
            .vm()
            .restorable_state()
            .ok_or(SearchError::Unsupported {
                strategy: self.name(),
                capability: "restorable snapshots",
            })?;

        search.run_state_mut().set_state_matching(false);
        search.run_state_mut().set_depth(initial.path_length());
        search.notify_search_started()?;

        let mut reason = None;
        while !search.is_done() {
            search.check_and_reset_probe_request()?;

            let depth_limit = search.run_state().depth_limit();
            let within_limit = search.depth() < depth_limit;
            let interrupted = search.check_and_reset_backtrack_request();
            let attempted = within_limit && !interrupted;
            let advanced = attempted && search.forward();

            if advanced {
                search.run_state_mut().increment_depth();
                search.notify_state_advanced()?;
            } else if attempted {
                search.notify_state_processed()?;
            } else if !within_limit {
                search.notify_search_constraint_hit(format!(
                    "depth limit reached: {depth_limit}"
                ))?;
                // The walk ends without a forward step, so check the final state once.
                search.check_property_violation();
            }

            if search.run_state().is_error_state() {
                search.notify_property_violated()?;
                if search.has_property_termination() {
                    reason = Some(StopReason::PropertyViolated);
                    break;
                }
                // Continuing past the error: this walk is over.
                search.check_and_reset_backtrack_request();
            } else if advanced && !search.is_end_state() {
                continue;
            }

            self.walks += 1;
            debug!(walks = self.walks, depth = search.depth(), "random walk finished");
            if self.walks >= self.path_limit {
                reason = Some(StopReason::PathLimitReached);
                break;
            }

            search.restore_state(&initial, self.name())?;
            search.run_state_mut().vm_mut().reset_next_choice();
            search.notify_state_restored()?;
        }

        search.notify_search_finished()?;
        Ok(reason.unwrap_or(StopReason::Terminated))
    }

    fn name(&self) -> &'static str {
        "random_restart"
    }

    fn supports_backtrack(&self) -> bool {
        false
    }

    fn supports_restore_state(&self) -> bool {
        true
    }
}
