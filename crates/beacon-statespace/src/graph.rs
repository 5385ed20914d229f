//! Declared state graphs.
//!
//! A `StateGraph` is an explicit transition system: numbered states, labelled
//! transitions attributed to a thread, and optional per-state thread statuses. State
//! 0 is the initial state.

use serde::{Deserialize, Serialize};

use beacon_search::vm::{StateId, ThreadInfo};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("state graph has no states")]
    Empty,

    #[error("transition {from} -> {to} targets an unknown state")]
    UnknownTarget { from: StateId, to: StateId },

    #[error("unknown state {state_id}")]
    UnknownState { state_id: StateId },

    #[error("invalid state graph: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub to: StateId,
    #[serde(default)]
    pub thread: u32,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub end: bool,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Thread statuses in this state. Falls back to the graph-wide list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<Vec<ThreadInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateGraph {
    #[serde(default)]
    pub name: String,
    pub states: Vec<GraphState>,
    #[serde(default)]
    pub threads: Vec<ThreadInfo>,
}

impl StateGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            threads: Vec::new(),
        }
    }

    /// Parse a graph from JSON and check that every transition target exists.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let graph: StateGraph = serde_json::from_str(json)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.states.is_empty() {
            return Err(GraphError::Empty);
        }
        for (from, state) in self.states.iter().enumerate() {
            if let Some(edge) = state.edges.iter().find(|e| e.to >= self.states.len()) {
                return Err(GraphError::UnknownTarget { from, to: edge.to });
            }
        }
        Ok(())
    }

    pub fn add_state(&mut self, label: impl Into<String>) -> StateId {
        let id = self.states.len();
        self.states.push(GraphState {
            label: label.into(),
            ..GraphState::default()
        });
        id
    }

    pub fn add_transition(
        &mut self,
        from: StateId,
        to: StateId,
        thread: u32,
        label: impl Into<String>,
    ) -> Result<(), GraphError> {
        if to >= self.states.len() {
            return Err(GraphError::UnknownTarget { from, to });
        }
        let state = self.state_mut(from)?;
        state.edges.push(GraphEdge {
            to,
            thread,
            label: label.into(),
        });
        Ok(())
    }

    pub fn mark_end(&mut self, state_id: StateId) -> Result<(), GraphError> {
        self.state_mut(state_id)?.end = true;
        Ok(())
    }

    /// Thread statuses to report while `state_id` is the current state.
    pub fn set_threads(
        &mut self,
        state_id: StateId,
        threads: Vec<ThreadInfo>,
    ) -> Result<(), GraphError> {
        self.state_mut(state_id)?.threads = Some(threads);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, state_id: StateId) -> Option<&GraphState> {
        self.states.get(state_id)
    }

    pub fn edges(&self, state_id: StateId) -> &[GraphEdge] {
        self.states
            .get(state_id)
            .map(|s| s.edges.as_slice())
            .unwrap_or_default()
    }

    /// Flagged end states and states without successors.
    pub fn is_end(&self, state_id: StateId) -> bool {
        self.states
            .get(state_id)
            .is_some_and(|s| s.end || s.edges.is_empty())
    }

    pub fn threads_at(&self, state_id: StateId) -> &[ThreadInfo] {
        self.states
            .get(state_id)
            .and_then(|s| s.threads.as_deref())
            .unwrap_or(self.threads.as_slice())
    }

    fn state_mut(&mut self, state_id: StateId) -> Result<&mut GraphState, GraphError> {
        self.states
            .get_mut(state_id)
            .ok_or(GraphError::UnknownState { state_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_search::vm::ThreadStatus;

    fn diamond() -> StateGraph {
        let mut graph = StateGraph::new("diamond");
        let s0 = graph.add_state("init");
        let s1 = graph.add_state("left");
        let s2 = graph.add_state("right");
        let s3 = graph.add_state("join");
        graph.add_transition(s0, s1, 0, "a").unwrap();
        graph.add_transition(s0, s2, 1, "b").unwrap();
        graph.add_transition(s1, s3, 1, "b").unwrap();
        graph.add_transition(s2, s3, 0, "a").unwrap();
        graph
    }

    #[test]
    fn test_builder() {
        let graph = diamond();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.edges(0).len(), 2);
        assert!(graph.is_end(3));
        assert!(!graph.is_end(0));
        assert!(graph.edges(99).is_empty());
    }

    #[test]
    fn test_unknown_target_rejected() {
        let mut graph = diamond();
        assert!(matches!(
            graph.add_transition(0, 7, 0, "x"),
            Err(GraphError::UnknownTarget { from: 0, to: 7 })
        ));
        assert!(matches!(
            graph.mark_end(9),
            Err(GraphError::UnknownState { state_id: 9 })
        ));
    }

    #[test]
    fn test_from_json() {
        let graph = StateGraph::from_json(
            r#"{
                "name": "two-step",
                "threads": [{ "id": 0, "name": "main", "status": "runnable" }],
                "states": [
                    { "label": "init", "edges": [{ "to": 1, "label": "go" }] },
                    { "label": "done", "end": true,
                      "threads": [{ "id": 0, "name": "main", "status": "terminated" }] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(graph.name, "two-step");
        assert_eq!(graph.edges(0)[0].thread, 0);
        assert_eq!(graph.threads_at(0)[0].status, ThreadStatus::Runnable);
        assert_eq!(graph.threads_at(1)[0].status, ThreadStatus::Terminated);
    }

    #[test]
    fn test_from_json_rejects_dangling_edge() {
        let err = StateGraph::from_json(r#"{ "states": [{ "edges": [{ "to": 3 }] }] }"#)
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownTarget { from: 0, to: 3 }));
        assert!(matches!(
            StateGraph::from_json(r#"{ "states": [] }"#),
            Err(GraphError::Empty)
        ));
    }
}
