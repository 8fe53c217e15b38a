pub mod codec;
pub mod config;
pub mod error;
pub mod page;
pub mod state;
pub mod tree;
pub mod validation;
pub mod web;

pub use codec::{AdapterRegistry, StateFormatter, Value};
pub use config::Config;
pub use error::{CorruptionKind, Result, StateError};
pub use page::{Page, PageFields, PostedFields, StatePersister};
pub use state::{SetOutcome, Snapshot, StateContainer};
pub use tree::{ControlTree, NodeId, NodeSpec, StateMode};
pub use validation::ReplayRegistry;
