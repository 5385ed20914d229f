use crate::error::SearchResult;
use crate::search::{Search, StopReason};

use super::SearchStrategy;

/// Replays a single recorded path.
///
/// State matching is switched off for the whole replay, so no state counts as
/// visited. Listeners may still request a backtrack, which is honored at the top of
/// the next iteration.
#[derive(Debug, Default)]
pub struct PathReplay;

impl PathReplay {
    pub fn new() -> Self {
        Self
    }
}

impl SearchStrategy for PathReplay {
    fn search(&mut self, search: &mut Search) -> SearchResult<StopReason> {
        search.run_state_mut().set_state_matching(false);
        search.run_state_mut().set_depth(0);
        search.notify_search_started()?;

        let mut reason = None;
        while !search.is_done() {
            search.check_and_reset_probe_request()?;

            if search.check_and_reset_backtrack_request() {
                if !search.backtrack() {
                    reason = Some(StopReason::Exhausted);
                    break;
                }
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
                }

                if search.is_end_state() {
                    reason = Some(StopReason::EndStateReached);
                    break;
                }
            } else {
                search.notify_state_processed()?;
                reason = Some(StopReason::DeadEnd);
                if search.run_state().is_error_state() {
                    search.notify_property_violated()?;
                    reason = Some(StopReason::PropertyViolated);
                }
                break;
            }
        }

        search.notify_search_finished()?;
        search.run_state_mut().set_state_matching(true);
        Ok(reason.unwrap_or(StopReason::Terminated))
    }

    fn name(&self) -> &'static str {
        "path_replay"
    }
}
