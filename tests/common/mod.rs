//! Shared test utilities for postback
//!
//! This module provides common helpers for integration tests:
//! - Control tree fixtures in a few structural variants
//! - Proptest strategies for value graphs
//! - Helpers for feeding one response's fields into the next request

#![allow(dead_code)]

pub mod fixtures;
pub mod values;

use postback::page::{PageFields, PostedFields};

/// Turn a response's hidden fields into the next request's posted fields.
pub fn post_back(fields: &PageFields) -> PostedFields {
    let hidden = fields.hidden_fields();
    PostedFields::from_form(hidden.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .expect("rendered fields parse back")
}
