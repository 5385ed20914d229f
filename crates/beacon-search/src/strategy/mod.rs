//! Search strategies.
//!
//! Each strategy drives the same `Search` primitives with its own loop. They share
//! the run state and helpers, not an inheritance chain.

pub mod dfs;
pub mod heuristic;
pub mod path;
pub mod random;
pub mod simulation;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::error::SearchResult;
use crate::search::{Search, StopReason};

pub use dfs::DepthFirstSearch;
pub use heuristic::{BreadthFirst, DeepestFirst, Heuristic, HeuristicSearch, RandomPriority};
pub use path::PathReplay;
pub use random::RandomRestart;
pub use simulation::Simulation;

/// An exploration algorithm over a `Search`.
pub trait SearchStrategy {
    /// Drive the search until it stops. Notifications are fired through `search`.
    fn search(&mut self, search: &mut Search) -> SearchResult<StopReason>;

    /// Name of this strategy (for tracing and errors).
    fn name(&self) -> &'static str;

    /// Whether the strategy steps back one state at a time.
    fn supports_backtrack(&self) -> bool {
        true
    }

    /// Whether the strategy resumes from stored snapshots.
    fn supports_restore_state(&self) -> bool {
        false
    }
}

/// Strategy selection for configuration-driven drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Dfs,
    PathReplay,
    RandomRestart,
    Simulation,
    BreadthFirst,
    DeepestFirst,
    RandomHeuristic,
}

impl StrategyKind {
    pub fn build(&self, config: &SearchConfig) -> Box<dyn SearchStrategy> {
        match self {
            StrategyKind::Dfs => Box::new(DepthFirstSearch::new()),
            StrategyKind::PathReplay => Box::new(PathReplay::new()),
            StrategyKind::RandomRestart => Box::new(RandomRestart::new(config.path_limit)),
            StrategyKind::Simulation => Box::new(Simulation::new()),
            StrategyKind::BreadthFirst => Box::new(HeuristicSearch::new(BreadthFirst)),
            StrategyKind::DeepestFirst => Box::new(HeuristicSearch::new(DeepestFirst)),
            StrategyKind::RandomHeuristic => Box::new(HeuristicSearch::new(RandomPriority::new(
                ChaCha8Rng::seed_from_u64(config.seed),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_names() {
        let config = SearchConfig::default();
        let names: Vec<&str> = [
            StrategyKind::Dfs,
            StrategyKind::PathReplay,
            StrategyKind::RandomRestart,
            StrategyKind::Simulation,
            StrategyKind::BreadthFirst,
        ]
        .iter()
        .map(|k| k.build(&config).name())
        .collect();
        assert_eq!(
            names,
            vec!["dfs", "path_replay", "random_restart", "simulation", "heuristic"]
        );
    }

    #[test]
    fn test_capabilities() {
        let config = SearchConfig::default();
        assert!(StrategyKind::Dfs.build(&config).supports_backtrack());
        assert!(!StrategyKind::RandomRestart.build(&config).supports_backtrack());
        assert!(!StrategyKind::Simulation.build(&config).supports_backtrack());
        let bfs = StrategyKind::BreadthFirst.build(&config);
        assert!(!bfs.supports_backtrack());
        assert!(bfs.supports_restore_state());
    }

    #[test]
    fn test_kind_serde_names() {
        let kind: StrategyKind = serde_json::from_str("\"path_replay\"").unwrap();
        assert_eq!(kind, StrategyKind::PathReplay);
    }
}
