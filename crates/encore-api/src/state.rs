//! Application state, constructed once in `main` and injected into handlers
//! via axum's `State` extractor. The job registry lives here rather than in
//! a module-level global so tests can build isolated instances.

use std::sync::Arc;

use encore_core::Config;
use encore_storage::Storage;

use crate::jobs::JobRegistry;

pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn Storage>, jobs: JobRegistry) -> Self {
        Self {
            config,
            storage,
            jobs,
        }
    }
}
