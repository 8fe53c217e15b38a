//! Per-control state and its persisted snapshot form.

pub mod container;
pub mod snapshot;

pub use container::{SetOutcome, StateContainer, StateEntry};
pub use snapshot::{ChildSnapshots, Snapshot, StateDelta};
