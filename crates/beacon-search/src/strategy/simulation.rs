use crate::error::SearchResult;
use crate::search::{Search, StopReason};

use super::SearchStrategy;

/// Runs the program once along whatever choices the engine makes.
///
/// No state matching and no backtracking: the run stops at the first dead end, end
/// state or violation.
#[derive(Debug, Default)]
pub struct Simulation;

impl Simulation {
    pub fn new() -> Self {
        Self
    }
}

impl SearchStrategy for Simulation {
    fn search(&mut self, search: &mut Search) -> SearchResult<StopReason> {
        search.run_state_mut().set_state_matching(false);
        search.run_state_mut().set_depth(0);
        search.notify_search_started()?;

        let mut reason = None;
        while !search.is_done() {
            search.check_and_reset_probe_request()?;

            if !search.forward() {
                search.notify_state_processed()?;
                reason = Some(StopReason::DeadEnd);
                if search.run_state().is_error_state() {
                    search.notify_property_violated()?;
                    reason = Some(StopReason::PropertyViolated);
                }
                break;
            }
            search.run_state_mut().increment_depth();
            search.notify_state_advanced()?;

            if search.run_state().is_error_state() {
                search.notify_property_violated()?;
                reason = Some(StopReason::PropertyViolated);
                break;
            }
            if search.is_end_state() {
                reason = Some(StopReason::EndStateReached);
                break;
            }
        }

        search.notify_search_finished()?;
        Ok(reason.unwrap_or(StopReason::Terminated))
    }

    fn name(&self) -> &'static str {
        "simulation"
    }

    fn supports_backtrack(&self) -> bool {
        false
    }
}
