//! Demo web surface that round-trips a page through real form posts.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::WebError;
pub use server::{build_router, run_server};
pub use state::WebAppState;
