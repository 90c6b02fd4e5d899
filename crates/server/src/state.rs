use std::sync::Arc;

use sopreg_core::{Config, Reconciler};

/// Shared application state
pub struct AppState {
    config: Config,
    reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(config: Config, reconciler: Arc<Reconciler>) -> Self {
        Self { config, reconciler }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }
}
