//! Execution-engine contract consumed by the search core.
//!
//! The search never interprets the program under verification itself. It drives an
//! engine that can step forward one scheduling/data decision at a time, roll back to
//! the previous decision point, and identify the state it is currently in.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Identity the engine assigns to a state. Ids are dense and assigned monotonically.
pub type StateId = usize;

/// One transition of the execution path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Thread that ran during this transition.
    pub thread_id: u32,
    /// Human-readable description of the choice that was taken.
    pub choice: String,
    /// State reached at the end of the transition.
    pub state_id: StateId,
}

/// The sequence of transitions from the initial state to the current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    application: String,
    transitions: Vec<Transition>,
}

impl Path {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            transitions: Vec::new(),
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn pop(&mut self) -> Option<Transition> {
        self.transitions.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.transitions.truncate(len);
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn last(&self) -> Option<&Transition> {
        self.transitions.last()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Scheduling status of a thread of the program under verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Runnable,
    Blocked,
    Waiting,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: u32,
    pub name: String,
    pub status: ThreadStatus,
}

/// Snapshot of all threads at the current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadList {
    threads: Vec<ThreadInfo>,
}

impl ThreadList {
    pub fn new(threads: Vec<ThreadInfo>) -> Self {
        Self { threads }
    }

    pub fn threads(&self) -> &[ThreadInfo] {
        &self.threads
    }

    pub fn replace(&mut self, threads: Vec<ThreadInfo>) {
        self.threads = threads;
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut ThreadInfo> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    pub fn runnable_count(&self) -> usize {
        self.threads
            .iter()
            .filter(|t| t.status == ThreadStatus::Runnable)
            .count()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

/// Live path object owned by the engine. Single-error mode records alias it.
pub type SharedPath = Rc<RefCell<Path>>;

/// Live thread list owned by the engine. Single-error mode records alias it.
pub type SharedThreadList = Rc<RefCell<ThreadList>>;

/// Opaque engine snapshot that can be restored later.
///
/// The payload is engine specific; the search only needs the path length so it can
/// keep its depth in sync after a restore.
pub struct VmSnapshot {
    path_length: usize,
    payload: Box<dyn Any>,
}

impl VmSnapshot {
    pub fn new<T: Any>(path_length: usize, payload: T) -> Self {
        Self {
            path_length,
            payload: Box::new(payload),
        }
    }

    pub fn path_length(&self) -> usize {
        self.path_length
    }

    /// Downcast the payload. Engines return `None` for snapshots they did not create.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for VmSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmSnapshot")
            .field("path_length", &self.path_length)
            .finish_non_exhaustive()
    }
}

/// The engine that executes the program under verification.
///
/// Every call is blocking and non-reentrant. After `forward` returns `false` no
/// transition occurred, and `is_new_state` must report `false` until the next
/// successful step.
pub trait VirtualMachine {
    /// Execute up to the next nondeterministic choice. `false` means nothing was
    /// executed because the current state has no unexplored choice left.
    fn forward(&mut self) -> bool;

    /// Restore the most recently saved prior state. `false` at the root.
    fn backtrack(&mut self) -> bool;

    fn is_new_state(&self) -> bool;

    fn is_end_state(&self) -> bool;

    fn is_ignored_state(&self) -> bool;

    fn ignore_state(&mut self, ignored: bool);

    fn state_id(&self) -> StateId;

    fn transition_occurred(&self) -> bool;

    /// Live handle to the current path.
    fn path(&self) -> SharedPath;

    /// Live handle to the current thread list.
    fn thread_list(&self) -> SharedThreadList;

    fn path_length(&self) -> usize {
        self.path().borrow().len()
    }

    /// Snapshot that `restore_state` can return to. Engines that cannot restore
    /// arbitrary states return `None`.
    fn restorable_state(&self) -> Option<VmSnapshot> {
        None
    }

    /// Restore a snapshot produced by `restorable_state`. `false` if the snapshot
    /// was not produced by this engine.
    fn restore_state(&mut self, _snapshot: &VmSnapshot) -> bool {
        false
    }

    /// Discard the remaining choices of the current decision point so that the next
    /// `forward` makes a fresh choice.
    fn reset_next_choice(&mut self) {}
}
