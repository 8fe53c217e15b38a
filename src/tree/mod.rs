//! The control tree and state propagation across it.

pub mod control;
pub mod propagate;

pub use control::{
    ChildMatch, ControlTree, NodeId, NodeSpec, StateMode, DEFAULT_ID_SEPARATOR,
    GENERATED_ID_PREFIX,
};
pub use propagate::{collect, redistribute, RedistributeReport};
