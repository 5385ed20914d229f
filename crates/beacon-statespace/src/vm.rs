//! Execution engine over a `StateGraph`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use beacon_search::vm::{
    Path, SharedPath, SharedThreadList, StateId, ThreadList, Transition, VirtualMachine,
    VmSnapshot,
};

use crate::graph::{GraphError, StateGraph};

/// One decision point: a state and the order in which its edges are tried.
#[derive(Debug, Clone)]
struct Frame {
    state: StateId,
    choices: Vec<usize>,
    next: usize,
}

/// Payload of the snapshots handed out by `GraphVm`.
#[derive(Debug, Clone)]
struct GraphSnapshot {
    frames: Vec<Frame>,
    path: Path,
}

/// Steps through a `StateGraph` one transition at a time.
///
/// The choice stack has one frame per state on the current path. `forward` takes
/// the next untried edge of the top frame; `backtrack` pops the frame. The visited
/// set lives for the lifetime of the engine and is not rolled back by `backtrack`
/// or `restore_state`.
pub struct GraphVm {
    graph: StateGraph,
    frames: Vec<Frame>,
    visited: HashSet<StateId>,
    ignored: HashSet<StateId>,
    is_new: bool,
    transition_occurred: bool,
    rng: Option<ChaCha8Rng>,
    path: SharedPath,
    threads: SharedThreadList,
}

impl GraphVm {
    pub fn new(graph: StateGraph) -> Result<Self, GraphError> {
        graph.validate()?;
        let path = Rc::new(RefCell::new(Path::new(graph.name.clone())));
        let threads = Rc::new(RefCell::new(ThreadList::new(graph.threads_at(0).to_vec())));
        let mut vm = Self {
            graph,
            frames: Vec::new(),
            visited: HashSet::from([0]),
            ignored: HashSet::new(),
            is_new: true,
            transition_occurred: false,
            rng: None,
            path,
            threads,
        };
        let root = vm.frame(0);
        vm.frames.push(root);
        Ok(vm)
    }

    /// Try edges in a seeded random order instead of declaration order.
    pub fn with_random_choices(mut self, seed: u64) -> Self {
        self.rng = Some(ChaCha8Rng::seed_from_u64(seed));
        if let Some(root) = self.frames.first_mut() {
            if let Some(rng) = self.rng.as_mut() {
                root.choices.shuffle(rng);
            }
        }
        self
    }

    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_visited(&self, state_id: StateId) -> bool {
        self.visited.contains(&state_id)
    }

    fn current(&self) -> StateId {
        self.frames.last().map_or(0, |f| f.state)
    }

    fn frame(&mut self, state: StateId) -> Frame {
        let mut choices: Vec<usize> = if self.graph.is_end(state) {
            Vec::new()
        } else {
            (0..self.graph.edges(state).len()).collect()
        };
        if let Some(rng) = self.rng.as_mut() {
            choices.shuffle(rng);
        }
        Frame {
            state,
            choices,
            next: 0,
        }
    }

    fn sync_threads(&self) {
        let threads = self.graph.threads_at(self.current()).to_vec();
        self.threads.borrow_mut().replace(threads);
    }
}

impl VirtualMachine for GraphVm {
    fn forward(&mut self) -> bool {
        let Some(top) = self.frames.last_mut() else {
            return false;
        };
        let Some(&edge_index) = top.choices.get(top.next) else {
            self.is_new = false;
            self.transition_occurred = false;
            return false;
        };
        top.next += 1;
        let from = top.state;
        let Some(edge) = self.graph.edges(from).get(edge_index).cloned() else {
            self.is_new = false;
            self.transition_occurred = false;
            return false;
        };

        let frame = self.frame(edge.to);
        self.frames.push(frame);
        self.is_new = self.visited.insert(edge.to);
        self.transition_occurred = true;
        self.path.borrow_mut().push(Transition {
            thread_id: edge.thread,
            choice: edge.label,
            state_id: edge.to,
        });
        self.sync_threads();
        trace!(from, to = edge.to, is_new = self.is_new, "graph transition");
        true
    }

    fn backtrack(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }
        self.frames.pop();
        self.path.borrow_mut().pop();
        self.is_new = false;
        self.transition_occurred = false;
        self.sync_threads();
        true
    }

    fn is_new_state(&self) -> bool {
        self.is_new
    }

    fn is_end_state(&self) -> bool {
        self.graph.is_end(self.current())
    }

    fn is_ignored_state(&self) -> bool {
        self.ignored.contains(&self.current())
    }

    fn ignore_state(&mut self, ignored: bool) {
        let state = self.current();
        if ignored {
            self.ignored.insert(state);
        } else {
            self.ignored.remove(&state);
        }
    }

    fn state_id(&self) -> StateId {
        self.current()
    }

    fn transition_occurred(&self) -> bool {
        self.transition_occurred
    }

    fn path(&self) -> SharedPath {
        self.path.clone()
    }

    fn thread_list(&self) -> SharedThreadList {
        self.threads.clone()
    }

    fn restorable_state(&self) -> Option<VmSnapshot> {
        let snapshot = GraphSnapshot {
            frames: self.frames.clone(),
            path: self.path.borrow().clone(),
        };
        Some(VmSnapshot::new(self.frames.len().saturating_sub(1), snapshot))
    }

    fn restore_state(&mut self, snapshot: &VmSnapshot) -> bool {
        let Some(snapshot) = snapshot.payload::<GraphSnapshot>() else {
            return false;
        };
        self.frames = snapshot.frames.clone();
        *self.path.borrow_mut() = snapshot.path.clone();
        self.is_new = false;
        self.transition_occurred = false;
        self.sync_threads();
        true
    }

    fn reset_next_choice(&mut self) {
        let Some(top) = self.frames.last_mut() else {
            return;
        };
        if let Some(rng) = self.rng.as_mut() {
            top.choices.shuffle(rng);
        }
        top.next = 0;
    }
}
