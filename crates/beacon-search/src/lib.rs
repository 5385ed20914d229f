pub mod config;
pub mod depth_table;
pub mod error;
pub mod listener;
pub mod memory;
pub mod probe;
pub mod property;
pub mod record;
pub mod report;
pub mod search;
pub mod stats;
pub mod strategy;
pub mod vm;

pub use config::{MemorySize, SearchConfig};
pub use error::{ConfigError, ListenerError, SearchError, SearchEvent, SearchResult};
pub use listener::{ListenerResult, SearchListener};
pub use property::{property_handle, PredicateProperty, Property, PropertyHandle};
pub use record::{ErrorRecord, ErrorSummary};
pub use report::{JsonPublisher, Publisher, Reporter, SearchReport, TracingPublisher};
pub use search::{Search, SearchOutcome, SearchRun, StopReason};
pub use stats::{SearchStats, Statistics};
pub use strategy::{SearchStrategy, StrategyKind};
pub use vm::{StateId, VirtualMachine, VmSnapshot};
