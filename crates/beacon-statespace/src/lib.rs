pub mod graph;
pub mod property;
pub mod vm;

pub use graph::{GraphEdge, GraphError, GraphState, StateGraph};
pub use property::{ForbiddenStates, NoDeadlock};
pub use vm::GraphVm;
