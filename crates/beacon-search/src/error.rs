use std::fmt;

use crate::vm::StateId;

/// Error type listener callbacks may return. Never swallowed by the search.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

pub type SearchResult<T> = Result<T, SearchError>;

/// The phase a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEvent {
    SearchStarted,
    StateAdvanced,
    StateProcessed,
    StateBacktracked,
    StateStored,
    StateRestored,
    PropertyViolated,
    SearchConstraintHit,
    SearchProbed,
    SearchFinished,
}

impl SearchEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEvent::SearchStarted => "searchStarted",
            SearchEvent::StateAdvanced => "stateAdvanced",
            SearchEvent::StateProcessed => "stateProcessed",
            SearchEvent::StateBacktracked => "stateBacktracked",
            SearchEvent::StateStored => "stateStored",
            SearchEvent::StateRestored => "stateRestored",
            SearchEvent::PropertyViolated => "propertyViolated",
            SearchEvent::SearchConstraintHit => "searchConstraintHit",
            SearchEvent::SearchProbed => "searchProbed",
            SearchEvent::SearchFinished => "searchFinished",
        }
    }
}

impl fmt::Display for SearchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control-flow failures that unwind a search run.
///
/// Property violations and constraint hits are not errors; they are recorded as data
/// on the run.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("exception during {event}() notification in listener '{listener}': {source}")]
    Listener {
        event: SearchEvent,
        listener: String,
        #[source]
        source: ListenerError,
    },

    #[error("asked for depth of unvisited state {state_id}")]
    UnvisitedState { state_id: StateId },

    #[error("strategy '{strategy}' requires {capability}, which the execution engine does not support")]
    Unsupported {
        strategy: &'static str,
        capability: &'static str,
    },

    #[error("execution engine rejected snapshot restore in strategy '{strategy}'")]
    RestoreFailed { strategy: &'static str },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid memory size '{value}'")]
    InvalidMemorySize { value: String },

    #[error("invalid search configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'{field}' must be greater than zero")]
    Zero { field: &'static str },
}
