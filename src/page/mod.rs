//! Request-cycle driver that carries a page's state between responses in
//! hidden form fields.

pub mod cycle;
pub mod persister;
pub mod protect;

pub use cycle::{
    LoadReport, Page, PageFields, PageOptions, PostedFields, STATE_FIELD, STATE_FIELD_COUNT,
    VALIDATION_FIELD,
};
pub use persister::{StatePersister, DEFAULT_MAX_STATE_LENGTH};
pub use protect::{MacProtector, NoProtection, StateProtector};
