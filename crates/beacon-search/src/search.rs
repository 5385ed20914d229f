//! The search engine core.
//!
//! `SearchRun` is the mutable bookkeeping of one verification attempt (depth, done
//! flag, errors, constraint message, depth table) wrapped around the execution
//! engine. `Search` adds the registered properties, listeners and reporter, and the
//! primitives every strategy composes: `forward`, `backtrack`, the property check and
//! the notification broadcast.

use tracing::{debug, error, info, trace, warn};

use crate::config::SearchConfig;
use crate::depth_table::DepthTable;
use crate::error::{SearchError, SearchEvent, SearchResult};
use crate::listener::{ListenerResult, SearchListener};
use crate::memory::{MemoryProbe, ProcessMemory};
use crate::probe::ProbeHandle;
use crate::property::PropertyHandle;
use crate::record::ErrorRecord;
use crate::strategy::SearchStrategy;
use crate::vm::{SharedPath, SharedThreadList, StateId, VirtualMachine, VmSnapshot};

/// Why a strategy stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Backtrack requested with nothing left above the root, or the queue ran dry.
    Exhausted,
    /// A violation was found and the search is not continuing past it.
    PropertyViolated,
    /// A hard search constraint (memory) stopped the search.
    ConstraintHit,
    /// `terminate()` was called.
    Terminated,
    /// The explored path reached an end state.
    EndStateReached,
    /// The engine could not advance any further along the current path.
    DeadEnd,
    /// The configured number of random walks was performed.
    PathLimitReached,
}

/// Summary handed back by `Search::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub reason: StopReason,
    pub depth: usize,
    pub errors: usize,
    pub last_constraint: Option<String>,
}

/// Mutable state of a single search run.
pub struct SearchRun {
    vm: Box<dyn VirtualMachine>,
    config: SearchConfig,
    depth: usize,
    done: bool,
    backtrack_requested: bool,
    current_error: Option<usize>,
    errors: Vec<ErrorRecord>,
    last_constraint: Option<String>,
    state_depth: DepthTable,
    state_matching: bool,
    /// (state id, depth, answer) of the last `is_new_state` query since the engine
    /// last moved.
    last_state_query: Option<(StateId, usize, bool)>,
    probe: ProbeHandle,
    memory: Box<dyn MemoryProbe>,
}

impl SearchRun {
    fn new(vm: Box<dyn VirtualMachine>, config: SearchConfig) -> Self {
        let mut run = Self {
            vm,
            config: SearchConfig::default(),
            depth: 0,
            done: false,
            backtrack_requested: false,
            current_error: None,
            errors: Vec::new(),
            last_constraint: None,
            state_depth: DepthTable::new(),
            state_matching: true,
            last_state_query: None,
            probe: ProbeHandle::new(),
            memory: Box::new(ProcessMemory::default()),
        };
        run.initialize(config);
        run
    }

    /// Shared by construction and reconfiguration.
    fn initialize(&mut self, config: SearchConfig) {
        debug!(
            depth_limit = config.depth_limit,
            match_by_min_depth = config.match_by_min_depth,
            min_free_memory = config.min_free_memory.as_bytes(),
            continue_on_violation = config.continue_on_violation,
            "search configured"
        );
        self.memory.configure(&config);
        self.config = config;
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn vm(&self) -> &dyn VirtualMachine {
        self.vm.as_ref()
    }

    pub fn vm_mut(&mut self) -> &mut dyn VirtualMachine {
        self.vm.as_mut()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub(crate) fn increment_depth(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn decrement_depth(&mut self) {
        debug_assert!(self.depth > 0, "backtracked above the root");
        self.depth -= 1;
    }

    pub fn depth_limit(&self) -> usize {
        self.config.depth_limit
    }

    pub fn set_depth_limit(&mut self, limit: usize) {
        self.config.depth_limit = limit;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Stop the search at its next iteration boundary. Fires no notification.
    pub fn terminate(&mut self) {
        self.done = true;
    }

    /// Ask the strategy to backtrack at the top of its next iteration.
    pub fn request_backtrack(&mut self) -> bool {
        self.backtrack_requested = true;
        true
    }

    /// Read and clear the pending backtrack request.
    pub fn check_and_reset_backtrack_request(&mut self) -> bool {
        std::mem::take(&mut self.backtrack_requested)
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.errors.last()
    }

    /// The error produced by the most recent forward step, if any.
    pub fn current_error(&self) -> Option<&ErrorRecord> {
        self.current_error.and_then(|i| self.errors.get(i))
    }

    pub fn is_error_state(&self) -> bool {
        self.current_error.is_some()
    }

    pub fn last_constraint(&self) -> Option<&str> {
        self.last_constraint.as_deref()
    }

    pub fn probe_handle(&self) -> ProbeHandle {
        self.probe.clone()
    }

    /// Request a `searchProbed` notification at the next poll point.
    pub fn probe_search(&self) {
        self.probe.request();
    }

    pub fn state_id(&self) -> StateId {
        self.vm.state_id()
    }

    pub fn is_end_state(&self) -> bool {
        self.vm.is_end_state()
    }

    pub fn is_ignored_state(&self) -> bool {
        self.vm.is_ignored_state()
    }

    pub fn set_ignored_state(&mut self, ignored: bool) {
        self.vm.ignore_state(ignored);
    }

    pub fn transition_occurred(&self) -> bool {
        self.vm.transition_occurred()
    }

    pub fn is_state_matching(&self) -> bool {
        self.state_matching
    }

    /// With matching disabled every state counts as new and the engine is not asked.
    pub fn set_state_matching(&mut self, enabled: bool) {
        self.state_matching = enabled;
        self.last_state_query = None;
    }

    /// Whether the current state has not been seen before.
    ///
    /// With `match_by_min_depth`, a state already seen deeper than the current depth
    /// counts as new again, and its recorded depth drops to the current one. The
    /// answer is stable until the engine moves, so listeners and the strategy can
    /// both ask.
    pub fn is_new_state(&mut self) -> SearchResult<bool> {
        if !self.state_matching {
            return Ok(true);
        }
        let state_id = self.vm.state_id();
        if let Some((id, depth, answer)) = self.last_state_query {
            if id == state_id && depth == self.depth {
                return Ok(answer);
            }
        }

        let mut is_new = self.vm.is_new_state();
        if self.config.match_by_min_depth {
            if is_new {
                self.state_depth.set(state_id, self.depth);
            } else if self.depth < self.state_depth.get(state_id)? {
                self.state_depth.set(state_id, self.depth);
                is_new = true;
            }
        }
        self.last_state_query = Some((state_id, self.depth, is_new));
        Ok(is_new)
    }

    pub fn is_visited_state(&mut self) -> SearchResult<bool> {
        Ok(!self.is_new_state()?)
    }

    /// Depth at which `state_id` was first recorded in match-by-min-depth mode.
    pub fn state_depth(&self, state_id: StateId) -> SearchResult<usize> {
        self.state_depth.get(state_id)
    }

    pub(crate) fn engine_moved(&mut self) {
        self.last_state_query = None;
    }

    /// Soft memory limit with one reclaim retry. `false` only if memory is still
    /// below the configured minimum after reclaiming.
    pub fn check_state_space_limit(&mut self) -> bool {
        let min_free = self.config.min_free_memory.as_bytes();
        match self.memory.available() {
            Some(available) if available < min_free => {
                debug!(available, min_free, "low memory, requesting reclaim");
                self.memory.reclaim();
                !matches!(self.memory.available(), Some(available) if available < min_free)
            }
            _ => true,
        }
    }

    /// Record a violation of `property`.
    ///
    /// In multi-error mode the property, path and thread list are deep-copied so
    /// later engine mutation cannot change the record. Otherwise the record aliases
    /// the live objects and the search is done.
    pub fn error(
        &mut self,
        property: &PropertyHandle,
        path: SharedPath,
        thread_list: SharedThreadList,
    ) {
        let id = self.errors.len() + 1;
        let record = if self.config.continue_on_violation {
            ErrorRecord::detached(id, property, &path, &thread_list)
        } else {
            self.done = true;
            ErrorRecord::new(id, property.clone(), path, thread_list)
        };
        info!(
            id,
            property = %record.property_name(),
            depth = self.depth,
            "property violated"
        );
        self.errors.push(record);
        self.current_error = Some(self.errors.len() - 1);
    }

    /// Whether a current violation ends the search. In multi-error mode the
    /// violating state is left by requesting a backtrack instead.
    pub fn has_property_termination(&mut self) -> bool {
        if self.current_error.is_some() {
            if self.done {
                return true;
            }
            self.backtrack_requested = true;
        }
        false
    }
}

/// A search: the run state plus its properties, listeners and reporter.
pub struct Search {
    run: SearchRun,
    properties: Vec<PropertyHandle>,
    listeners: Vec<Box<dyn SearchListener>>,
    reporter: Option<Box<dyn SearchListener>>,
}

impl Search {
    pub fn new<V: VirtualMachine + 'static>(vm: V, config: SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            run: SearchRun::new(Box::new(vm), config),
            properties: Vec::new(),
            listeners: Vec::new(),
            reporter: None,
        })
    }

    /// Replace the memory source used by the state-space limit check.
    pub fn with_memory_probe<M: MemoryProbe + 'static>(mut self, probe: M) -> Self {
        self.run.memory = Box::new(probe);
        self.run.memory.configure(&self.run.config);
        self
    }

    /// Apply new settings through the same initialization used by `new`.
    pub fn reconfigure(&mut self, config: SearchConfig) -> SearchResult<()> {
        config.validate()?;
        self.run.initialize(config);
        Ok(())
    }

    pub fn run_state(&self) -> &SearchRun {
        &self.run
    }

    pub fn run_state_mut(&mut self) -> &mut SearchRun {
        &mut self.run
    }

    pub fn config(&self) -> &SearchConfig {
        self.run.config()
    }

    pub fn depth(&self) -> usize {
        self.run.depth
    }

    pub fn is_done(&self) -> bool {
        self.run.done
    }

    pub fn terminate(&mut self) {
        self.run.terminate();
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        self.run.errors()
    }

    pub fn last_constraint(&self) -> Option<&str> {
        self.run.last_constraint()
    }

    pub fn probe_handle(&self) -> ProbeHandle {
        self.run.probe_handle()
    }

    // --- listeners, reporter, properties

    pub fn add_listener<L: SearchListener + 'static>(&mut self, listener: L) {
        debug!(listener = listener.name(), "search listener added");
        self.listeners.push(Box::new(listener));
    }

    /// Remove the first listener with the given name.
    pub fn remove_listener(&mut self, name: &str) -> bool {
        match self.listeners.iter().position(|l| l.name() == name) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn has_listener(&self, name: &str) -> bool {
        self.listeners.iter().any(|l| l.name() == name)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// The report aggregator, always notified after every other listener.
    pub fn set_reporter<R: SearchListener + 'static>(&mut self, reporter: R) {
        self.reporter = Some(Box::new(reporter));
    }

    pub fn add_property(&mut self, property: PropertyHandle) {
        self.properties.push(property);
    }

    /// Remove the first property with the given name.
    pub fn remove_property(&mut self, name: &str) -> bool {
        match self
            .properties
            .iter()
            .position(|p| p.borrow().name() == name)
        {
            Some(index) => {
                self.properties.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn properties(&self) -> &[PropertyHandle] {
        &self.properties
    }

    pub fn reset_properties(&mut self) {
        for property in &self.properties {
            property.borrow_mut().reset();
        }
    }

    // --- primitives

    /// Run a strategy to completion.
    pub fn run(&mut self, strategy: &mut dyn SearchStrategy) -> SearchResult<SearchOutcome> {
        if self.properties.is_empty() {
            warn!("no property");
        }
        info!(strategy = strategy.name(), "running search");
        self.run.state_matching = true;
        let reason = strategy.search(self)?;
        self.run.done = true;
        Ok(SearchOutcome {
            reason,
            depth: self.run.depth,
            errors: self.run.errors.len(),
            last_constraint: self.run.last_constraint.clone(),
        })
    }

    /// Step the engine, then check every property against the new state.
    ///
    /// At most one error is recorded per step. Returns what the engine returned.
    pub fn forward(&mut self) -> bool {
        self.run.current_error = None;
        self.run.engine_moved();
        let advanced = self.run.vm.forward();
        self.check_property_violation();
        advanced
    }

    pub fn backtrack(&mut self) -> bool {
        self.run.engine_moved();
        self.run.vm.backtrack()
    }

    /// Restore an engine snapshot and resync depth with its path length.
    pub fn restore_state(
        &mut self,
        snapshot: &VmSnapshot,
        strategy: &'static str,
    ) -> SearchResult<()> {
        self.run.engine_moved();
        self.run.current_error = None;
        if !self.run.vm.restore_state(snapshot) {
            return Err(SearchError::RestoreFailed { strategy });
        }
        self.run.depth = snapshot.path_length();
        Ok(())
    }

    /// Evaluate properties in registration order; the first failure is recorded.
    pub fn check_property_violation(&mut self) -> bool {
        for property in &self.properties {
            let holds = property.borrow_mut().check(&self.run);
            if !holds {
                let path = self.run.vm.path();
                let thread_list = self.run.vm.thread_list();
                self.run.error(property, path, thread_list);
                return true;
            }
        }
        false
    }

    pub fn has_property_termination(&mut self) -> bool {
        self.run.has_property_termination()
    }

    pub fn is_new_state(&mut self) -> SearchResult<bool> {
        self.run.is_new_state()
    }

    pub fn is_end_state(&self) -> bool {
        self.run.is_end_state()
    }

    pub fn is_ignored_state(&self) -> bool {
        self.run.is_ignored_state()
    }

    pub fn check_state_space_limit(&mut self) -> bool {
        self.run.check_state_space_limit()
    }

    pub fn check_and_reset_backtrack_request(&mut self) -> bool {
        self.run.check_and_reset_backtrack_request()
    }

    /// Fire `searchProbed` if the probe flag was set since the last poll.
    pub fn check_and_reset_probe_request(&mut self) -> SearchResult<()> {
        if self.run.probe.take() {
            self.notify_search_probed()?;
        }
        Ok(())
    }

    // --- notifications

    fn broadcast(&mut self, event: SearchEvent) -> SearchResult<()> {
        let run = &mut self.run;
        for listener in self.listeners.iter_mut() {
            dispatch(listener.as_mut(), event, run)
                .map_err(|source| listener_failure(event, listener.name(), source))?;
        }
        if let Some(reporter) = self.reporter.as_mut() {
            dispatch(reporter.as_mut(), event, run)
                .map_err(|source| listener_failure(event, reporter.name(), source))?;
        }
        Ok(())
    }

    pub fn notify_search_started(&mut self) -> SearchResult<()> {
        info!(
            depth_limit = self.run.config.depth_limit,
            properties = self.properties.len(),
            listeners = self.listeners.len(),
            "search started"
        );
        self.broadcast(SearchEvent::SearchStarted)
    }

    pub fn notify_state_advanced(&mut self) -> SearchResult<()> {
        trace!(
            depth = self.run.depth,
            state_id = self.run.vm.state_id(),
            "state advanced"
        );
        self.broadcast(SearchEvent::StateAdvanced)
    }

    pub fn notify_state_processed(&mut self) -> SearchResult<()> {
        self.broadcast(SearchEvent::StateProcessed)
    }

    pub fn notify_state_backtracked(&mut self) -> SearchResult<()> {
        debug!(depth = self.run.depth, "state backtracked");
        self.broadcast(SearchEvent::StateBacktracked)
    }

    pub fn notify_state_stored(&mut self) -> SearchResult<()> {
        self.broadcast(SearchEvent::StateStored)
    }

    pub fn notify_state_restored(&mut self) -> SearchResult<()> {
        debug!(depth = self.run.depth, "state restored");
        self.broadcast(SearchEvent::StateRestored)
    }

    /// In multi-error mode properties are reset once everybody has seen the error.
    pub fn notify_property_violated(&mut self) -> SearchResult<()> {
        self.broadcast(SearchEvent::PropertyViolated)?;
        if self.run.config.continue_on_violation {
            self.reset_properties();
        }
        Ok(())
    }

    pub fn notify_search_constraint_hit(&mut self, details: impl Into<String>) -> SearchResult<()> {
        let details = details.into();
        info!(constraint = %details, depth = self.run.depth, "search constraint hit");
        self.run.last_constraint = Some(details);
        self.broadcast(SearchEvent::SearchConstraintHit)
    }

    pub fn notify_search_probed(&mut self) -> SearchResult<()> {
        self.broadcast(SearchEvent::SearchProbed)
    }

    pub fn notify_search_finished(&mut self) -> SearchResult<()> {
        info!(
            depth = self.run.depth,
            errors = self.run.errors.len(),
            "search finished"
        );
        self.broadcast(SearchEvent::SearchFinished)
    }
}

fn dispatch(
    listener: &mut dyn SearchListener,
    event: SearchEvent,
    run: &mut SearchRun,
) -> ListenerResult {
    match event {
        SearchEvent::SearchStarted => listener.search_started(run),
        SearchEvent::StateAdvanced => listener.state_advanced(run),
        SearchEvent::StateProcessed => listener.state_processed(run),
        SearchEvent::StateBacktracked => listener.state_backtracked(run),
        SearchEvent::StateStored => listener.state_stored(run),
        SearchEvent::StateRestored => listener.state_restored(run),
        SearchEvent::PropertyViolated => listener.property_violated(run),
        SearchEvent::SearchConstraintHit => listener.search_constraint_hit(run),
        SearchEvent::SearchProbed => listener.search_probed(run),
        SearchEvent::SearchFinished => listener.search_finished(run),
    }
}

fn listener_failure(
    event: SearchEvent,
    listener: &str,
    source: crate::error::ListenerError,
) -> SearchError {
    error!(%event, listener, error = %source, "listener failed");
    SearchError::Listener {
        event,
        listener: listener.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::property::{property_handle, PredicateProperty, Property};
    use crate::vm::{Path, ThreadList, Transition};

    /// Engine whose answers are set directly by the test.
    struct FixedVm {
        state_id: StateId,
        is_new: bool,
        path: SharedPath,
        threads: SharedThreadList,
    }

    impl FixedVm {
        fn new() -> Self {
            Self {
                state_id: 0,
                is_new: true,
                path: Rc::new(RefCell::new(Path::new("fixed"))),
                threads: Rc::new(RefCell::new(ThreadList::default())),
            }
        }
    }

    impl VirtualMachine for FixedVm {
        fn forward(&mut self) -> bool {
            self.path.borrow_mut().push(Transition {
                thread_id: 0,
                choice: "step".to_string(),
                state_id: self.state_id,
            });
            true
        }
        fn backtrack(&mut self) -> bool {
            self.path.borrow_mut().pop().is_some()
        }
        fn is_new_state(&self) -> bool {
            self.is_new
        }
        fn is_end_state(&self) -> bool {
            false
        }
        fn is_ignored_state(&self) -> bool {
            false
        }
        fn ignore_state(&mut self, _ignored: bool) {}
        fn state_id(&self) -> StateId {
            self.state_id
        }
        fn transition_occurred(&self) -> bool {
            true
        }
        fn path(&self) -> SharedPath {
            self.path.clone()
        }
        fn thread_list(&self) -> SharedThreadList {
            self.threads.clone()
        }
    }

    /// Memory source that stays at a fixed level and counts reclaims.
    struct LowMemory {
        available: u64,
        reclaims: Rc<RefCell<u32>>,
    }

    impl MemoryProbe for LowMemory {
        fn available(&self) -> Option<u64> {
            Some(self.available)
        }
        fn reclaim(&mut self) {
            *self.reclaims.borrow_mut() += 1;
        }
    }

    fn never(name: &str) -> PropertyHandle {
        property_handle(PredicateProperty::new(name, |_: &SearchRun| false))
    }

    fn run_with(vm: FixedVm, config: SearchConfig) -> SearchRun {
        SearchRun::new(Box::new(vm), config)
    }

    fn point_to(run: &mut SearchRun, state_id: StateId, is_new: bool, depth: usize) {
        let vm = FixedVm {
            state_id,
            is_new,
            ..FixedVm::new()
        };
        run.vm = Box::new(vm);
        run.depth = depth;
        run.engine_moved();
    }

    #[test]
    fn test_match_by_min_depth_revisit() {
        let config = SearchConfig::default().with_match_by_min_depth(true);
        let mut run = run_with(FixedVm::new(), config);

        point_to(&mut run, 7, true, 3);
        assert!(run.is_new_state().unwrap());
        assert_eq!(run.state_depth(7).unwrap(), 3);

        point_to(&mut run, 7, false, 5);
        assert!(!run.is_new_state().unwrap());

        point_to(&mut run, 7, false, 1);
        assert!(run.is_new_state().unwrap());
        assert_eq!(run.state_depth(7).unwrap(), 1);
    }

    #[test]
    fn test_is_new_state_stable_until_engine_moves() {
        let config = SearchConfig::default().with_match_by_min_depth(true);
        let mut run = run_with(FixedVm::new(), config);
        point_to(&mut run, 3, true, 4);
        assert!(run.is_new_state().unwrap());
        point_to(&mut run, 3, false, 2);
        assert!(run.is_new_state().unwrap());
        assert!(run.is_new_state().unwrap());
    }

    #[test]
    fn test_without_match_depth_engine_decides() {
        let mut run = run_with(FixedVm::new(), SearchConfig::default());
        point_to(&mut run, 7, false, 0);
        assert!(!run.is_new_state().unwrap());
        assert!(run.is_visited_state().unwrap());
    }

    #[test]
    fn test_unvisited_depth_query_fails() {
        let config = SearchConfig::default().with_match_by_min_depth(true);
        let mut run = run_with(FixedVm::new(), config);
        point_to(&mut run, 9, false, 2);
        assert!(matches!(
            run.is_new_state(),
            Err(SearchError::UnvisitedState { state_id: 9 })
        ));
    }

    #[test]
    fn test_state_matching_disabled_reports_new() {
        let mut run = run_with(FixedVm::new(), SearchConfig::default());
        point_to(&mut run, 1, false, 0);
        run.set_state_matching(false);
        assert!(run.is_new_state().unwrap());
    }

    #[test]
    fn test_memory_limit_after_reclaim() {
        let reclaims = Rc::new(RefCell::new(0));
        let config = SearchConfig::default();
        let mut search = Search::new(FixedVm::new(), config)
            .unwrap()
            .with_memory_probe(LowMemory {
                available: 1024,
                reclaims: reclaims.clone(),
            });
        assert!(!search.check_state_space_limit());
        assert_eq!(*reclaims.borrow(), 1);
    }

    #[test]
    fn test_memory_above_threshold_skips_reclaim() {
        let reclaims = Rc::new(RefCell::new(0));
        let mut search = Search::new(FixedVm::new(), SearchConfig::default())
            .unwrap()
            .with_memory_probe(LowMemory {
                available: 64 * 1024 * 1024,
                reclaims: reclaims.clone(),
            });
        assert!(search.check_state_space_limit());
        assert_eq!(*reclaims.borrow(), 0);
    }

    #[test]
    fn test_default_memory_limit_needs_ceiling() {
        let mut search = Search::new(FixedVm::new(), SearchConfig::default()).unwrap();
        assert!(search.config().max_memory.is_none());
        assert!(search.check_state_space_limit());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "backtracked above the root")]
    fn test_backtrack_above_root_is_caught() {
        let mut run = run_with(FixedVm::new(), SearchConfig::default());
        run.increment_depth();
        run.decrement_depth();
        assert_eq!(run.depth(), 0);
        run.decrement_depth();
    }

    #[test]
    fn test_single_error_aliases_live_path() {
        let mut search = Search::new(FixedVm::new(), SearchConfig::default()).unwrap();
        search.add_property(never("never"));
        search.forward();
        assert!(search.is_done());
        assert_eq!(search.errors().len(), 1);

        let recorded = search.errors()[0].path().clone();
        search.run_state_mut().vm_mut().forward();
        assert_eq!(recorded.borrow().len(), 2);
    }

    #[test]
    fn test_multi_error_detaches_live_path() {
        let config = SearchConfig::default().with_continue_on_violation(true);
        let mut search = Search::new(FixedVm::new(), config).unwrap();
        search.add_property(never("never"));
        search.forward();
        assert!(!search.is_done());

        let recorded = search.errors()[0].path().clone();
        search.run_state_mut().vm_mut().forward();
        assert_eq!(recorded.borrow().len(), 1);
        assert_eq!(search.errors()[0].id(), 1);
    }

    /// Fails every check and reports how often it was checked since the last reset.
    #[derive(Debug, Clone, Default)]
    struct CountingProperty {
        checks: usize,
    }

    impl Property for CountingProperty {
        fn check(&mut self, _run: &SearchRun) -> bool {
            self.checks += 1;
            false
        }

        fn reset(&mut self) {
            self.checks = 0;
        }

        fn name(&self) -> &str {
            "counting"
        }

        fn error_message(&self) -> Option<String> {
            Some(format!("checks: {}", self.checks))
        }
    }

    #[test]
    fn test_multi_error_detaches_threads_and_property() {
        use crate::vm::{ThreadInfo, ThreadStatus};

        let config = SearchConfig::default().with_continue_on_violation(true);
        let mut search = Search::new(FixedVm::new(), config).unwrap();
        let live = property_handle(CountingProperty::default());
        search.add_property(live.clone());
        let threads = search.run_state().vm().thread_list();
        threads.borrow_mut().replace(vec![ThreadInfo {
            id: 0,
            name: "main".to_string(),
            status: ThreadStatus::Runnable,
        }]);
        search.forward();

        let record = search.errors()[0].clone();
        assert!(!Rc::ptr_eq(record.property(), &live));
        assert!(!Rc::ptr_eq(record.thread_list(), &threads));

        threads.borrow_mut().replace(Vec::new());
        search.reset_properties();
        assert_eq!(live.borrow().error_message().as_deref(), Some("checks: 0"));
        search.forward();
        search.forward();
        assert_eq!(live.borrow().error_message().as_deref(), Some("checks: 2"));

        let summary = record.summary();
        assert_eq!(summary.message.as_deref(), Some("checks: 1"));
        assert_eq!(summary.threads.len(), 1);
        assert_eq!(summary.threads.threads()[0].name, "main");
    }

    #[test]
    fn test_forward_records_at_most_one_error() {
        let config = SearchConfig::default().with_continue_on_violation(true);
        let mut search = Search::new(FixedVm::new(), config).unwrap();
        search.add_property(never("a"));
        search.add_property(never("b"));
        search.forward();
        assert_eq!(search.errors().len(), 1);
        assert_eq!(search.errors()[0].property_name(), "a");
        search.forward();
        assert_eq!(search.errors().len(), 2);
        assert_eq!(search.errors()[1].id(), 2);
    }

    #[test]
    fn test_property_termination_requests_backtrack_in_multi_mode() {
        let config = SearchConfig::default().with_continue_on_violation(true);
        let mut search = Search::new(FixedVm::new(), config).unwrap();
        search.add_property(never("never"));
        search.forward();
        assert!(!search.has_property_termination());
        assert!(search.check_and_reset_backtrack_request());
        assert!(!search.check_and_reset_backtrack_request());
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut search = Search::new(FixedVm::new(), SearchConfig::default()).unwrap();
        search.terminate();
        assert!(search.is_done());
        search.terminate();
        assert!(search.is_done());
    }

    #[test]
    fn test_constraint_hit_sets_message() {
        let mut search = Search::new(FixedVm::new(), SearchConfig::default()).unwrap();
        search
            .notify_search_constraint_hit("depth limit reached: 3")
            .unwrap();
        assert_eq!(search.last_constraint(), Some("depth limit reached: 3"));
    }

    #[test]
    fn test_reconfigure_validates() {
        let mut search = Search::new(FixedVm::new(), SearchConfig::default()).unwrap();
        let bad = SearchConfig {
            path_limit: 0,
            ..SearchConfig::default()
        };
        assert!(matches!(
            search.reconfigure(bad),
            Err(SearchError::Config(_))
        ));
        search
            .reconfigure(SearchConfig::default().with_depth_limit(5))
            .unwrap();
        assert_eq!(search.run_state().depth_limit(), 5);
    }
}
