//! Shared state for the demo web server.

use std::sync::Arc;

use crate::config::PersistenceConfig;
use crate::page::{PageOptions, StatePersister};
use crate::tree::DEFAULT_ID_SEPARATOR;

/// Immutable per-process settings cloned into every handler.
#[derive(Debug, Clone)]
pub struct WebAppState {
    persister: Arc<StatePersister>,
    options: PageOptions,
    id_separator: char,
}

impl WebAppState {
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            persister: Arc::new(config.persister()),
            options: config.page_options(),
            id_separator: config.id_separator,
        }
    }

    pub fn persister(&self) -> &Arc<StatePersister> {
        &self.persister
    }

    pub fn options(&self) -> PageOptions {
        self.options
    }

    pub fn id_separator(&self) -> char {
        self.id_separator
    }
}

impl Default for WebAppState {
    fn default() -> Self {
        Self {
            persister: Arc::new(StatePersister::default()),
            options: PageOptions::default(),
            id_separator: DEFAULT_ID_SEPARATOR,
        }
    }
}
