//! Application state for the payroll engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::{ConfigLoader, EngineSettings};
use crate::store::{DocumentStore, InMemoryDocumentStore, PayrollRepository};

/// Shared application state.
///
/// Holds the read-only payroll data, the document store and the engine
/// settings.
#[derive(Clone)]
pub struct AppState {
    data: Arc<dyn PayrollRepository>,
    documents: Arc<dyn DocumentStore>,
    settings: Arc<EngineSettings>,
}

impl AppState {
    /// Creates application state from loaded configuration with an empty
    /// in-memory document store.
    pub fn new(config: ConfigLoader) -> Self {
        let (settings, data) = config.into_parts();
        Self::with_store(Arc::new(data), Arc::new(InMemoryDocumentStore::new()), settings)
    }

    /// Creates application state from explicit parts.
    pub fn with_store(
        data: Arc<dyn PayrollRepository>,
        documents: Arc<dyn DocumentStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            data,
            documents,
            settings: Arc::new(settings),
        }
    }

    /// Returns the payroll data.
    pub fn data(&self) -> &dyn PayrollRepository {
        self.data.as_ref()
    }

    /// Returns the document store.
    pub fn documents(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone_and_shareable() {
        fn assert_clone_send_sync<T: Clone + Send + Sync + 'static>() {}
        assert_clone_send_sync::<AppState>();
    }
}
