use crate::error::{SearchError, SearchResult};
use crate::vm::StateId;

/// Minimum depth at which each state id was seen.
///
/// Indexed directly by state id since ids are dense. Entries hold `depth + 1`; zero
/// means the state was never recorded.
#[derive(Debug, Clone, Default)]
pub struct DepthTable {
    depths: Vec<usize>,
}

impl DepthTable {
    pub fn new() -> Self {
        Self { depths: Vec::new() }
    }

    pub fn set(&mut self, state_id: StateId, depth: usize) {
        if state_id >= self.depths.len() {
            self.depths.resize(state_id + 1, 0);
        }
        self.depths[state_id] = depth + 1;
    }

    /// Depth the state was recorded at. Asking for a state that was never recorded
    /// is a caller bug and fails.
    pub fn get(&self, state_id: StateId) -> SearchResult<usize> {
        match self.depths.get(state_id) {
            Some(&depth_plus_one) if depth_plus_one > 0 => Ok(depth_plus_one - 1),
            _ => Err(SearchError::UnvisitedState { state_id }),
        }
    }

    pub fn contains(&self, state_id: StateId) -> bool {
        self.depths.get(state_id).is_some_and(|&d| d > 0)
    }

    pub fn clear(&mut self) {
        self.depths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut table = DepthTable::new();
        table.set(7, 3);
        assert_eq!(table.get(7).unwrap(), 3);
        assert!(table.contains(7));
        assert!(!table.contains(6));
    }

    #[test]
    fn test_depth_zero_is_distinct_from_unvisited() {
        let mut table = DepthTable::new();
        table.set(0, 0);
        assert_eq!(table.get(0).unwrap(), 0);
    }

    #[test]
    fn test_unvisited_fails() {
        let mut table = DepthTable::new();
        table.set(4, 1);
        assert!(matches!(
            table.get(2),
            Err(SearchError::UnvisitedState { state_id: 2 })
        ));
        assert!(matches!(
            table.get(100),
            Err(SearchError::UnvisitedState { state_id: 100 })
        ));
    }

    #[test]
    fn test_clear() {
        let mut table = DepthTable::new();
        table.set(1, 1);
        table.clear();
        assert!(!table.contains(1));
    }
}
