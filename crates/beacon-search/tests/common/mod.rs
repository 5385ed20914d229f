#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use beacon_search::listener::{ListenerResult, SearchListener};
use beacon_search::memory::MemoryProbe;
use beacon_search::vm::{
    Path, SharedPath, SharedThreadList, StateId, ThreadList, Transition, VirtualMachine,
};
use beacon_search::{SearchEvent, SearchRun};

/// Engine that answers `forward` from a fixed script, one entry per call.
///
/// Every successful step reaches a fresh state with the next id. Once the script runs
/// out `forward` keeps returning `false`.
pub struct ScriptedVm {
    script: VecDeque<bool>,
    next_id: StateId,
    states: Vec<StateId>,
    last_forward_ok: bool,
    ignored: bool,
    path: SharedPath,
    threads: SharedThreadList,
}

impl ScriptedVm {
    pub fn new(script: &[bool]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            next_id: 1,
            states: vec![0],
            last_forward_ok: true,
            ignored: false,
            path: Rc::new(RefCell::new(Path::new("scripted"))),
            threads: Rc::new(RefCell::new(ThreadList::default())),
        }
    }
}

impl VirtualMachine for ScriptedVm {
    fn forward(&mut self) -> bool {
        let ok = self.script.pop_front().unwrap_or(false);
        self.last_forward_ok = ok;
        if ok {
            let id = self.next_id;
            self.next_id += 1;
            self.states.push(id);
            self.path.borrow_mut().push(Transition {
                thread_id: 0,
                choice: format!("step {id}"),
                state_id: id,
            });
        }
        ok
    }

    fn backtrack(&mut self) -> bool {
        if self.states.len() <= 1 {
            return false;
        }
        self.states.pop();
        self.path.borrow_mut().pop();
        self.last_forward_ok = false;
        true
    }

    fn is_new_state(&self) -> bool {
        self.last_forward_ok
    }

    fn is_end_state(&self) -> bool {
        false
    }

    fn is_ignored_state(&self) -> bool {
        self.ignored
    }

    fn ignore_state(&mut self, ignored: bool) {
        self.ignored = ignored;
    }

    fn state_id(&self) -> StateId {
        self.states.last().copied().unwrap_or(0)
    }

    fn transition_occurred(&self) -> bool {
        self.last_forward_ok
    }

    fn path(&self) -> SharedPath {
        self.path.clone()
    }

    fn thread_list(&self) -> SharedThreadList {
        self.threads.clone()
    }
}

/// Memory source stuck below any sensible threshold.
pub struct ExhaustedMemory {
    pub reclaims: Rc<RefCell<u32>>,
}

impl MemoryProbe for ExhaustedMemory {
    fn available(&self) -> Option<u64> {
        Some(16)
    }

    fn reclaim(&mut self) {
        *self.reclaims.borrow_mut() += 1;
    }
}

pub type EventLog = Rc<RefCell<Vec<(&'static str, SearchEvent)>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Appends `(name, event)` for every notification it receives.
pub struct Recorder {
    name: &'static str,
    log: EventLog,
}

impl Recorder {
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }

    fn record(&self, event: SearchEvent) -> ListenerResult {
        self.log.borrow_mut().push((self.name, event));
        Ok(())
    }
}

impl SearchListener for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn search_started(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::SearchStarted)
    }

    fn state_advanced(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::StateAdvanced)
    }

    fn state_processed(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::StateProcessed)
    }

    fn state_backtracked(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::StateBacktracked)
    }

    fn state_stored(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::StateStored)
    }

    fn state_restored(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::StateRestored)
    }

    fn property_violated(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::PropertyViolated)
    }

    fn search_constraint_hit(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::SearchConstraintHit)
    }

    fn search_probed(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::SearchProbed)
    }

    fn search_finished(&mut self, _run: &mut SearchRun) -> ListenerResult {
        self.record(SearchEvent::SearchFinished)
    }
}

pub fn count(log: &EventLog, name: &str, event: SearchEvent) -> usize {
    log.borrow()
        .iter()
        .filter(|(n, e)| *n == name && *e == event)
        .count()
}

/// `Write` sink the test keeps a handle to.
#[derive(Clone, Default)]
pub struct SharedBuffer(pub Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
