//! Generic properties over explicit-state engines.

use std::collections::BTreeSet;

use beacon_search::vm::{StateId, ThreadStatus};
use beacon_search::{Property, SearchRun};

/// Violated when the search reaches any of the given states.
#[derive(Debug, Clone)]
pub struct ForbiddenStates {
    states: BTreeSet<StateId>,
    hit: Option<StateId>,
}

impl ForbiddenStates {
    pub fn new(states: impl IntoIterator<Item = StateId>) -> Self {
        Self {
            states: states.into_iter().collect(),
            hit: None,
        }
    }
}

impl Property for ForbiddenStates {
    fn check(&mut self, run: &SearchRun) -> bool {
        let state = run.state_id();
        if self.states.contains(&state) {
            self.hit = Some(state);
            return false;
        }
        true
    }

    fn reset(&mut self) {
        self.hit = None;
    }

    fn name(&self) -> &str {
        "forbidden_states"
    }

    fn error_message(&self) -> Option<String> {
        self.hit.map(|state| format!("reached forbidden state {state}"))
    }
}

/// Violated when threads exist, none of them can run and not all have terminated.
#[derive(Debug, Clone, Default)]
pub struct NoDeadlock {
    blocked: Vec<String>,
}

impl NoDeadlock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Property for NoDeadlock {
    fn check(&mut self, run: &SearchRun) -> bool {
        let threads = run.vm().thread_list();
        let threads = threads.borrow();
        let live: Vec<_> = threads
            .threads()
            .iter()
            .filter(|t| t.status != ThreadStatus::Terminated)
            .collect();
        if live.is_empty() || threads.runnable_count() > 0 {
            return true;
        }
        self.blocked = live.iter().map(|t| t.name.clone()).collect();
        false
    }

    fn reset(&mut self) {
        self.blocked.clear();
    }

    fn name(&self) -> &str {
        "no_deadlock"
    }

    fn error_message(&self) -> Option<String> {
        (!self.blocked.is_empty()).then(|| format!("deadlock: {}", self.blocked.join(", ")))
    }
}
