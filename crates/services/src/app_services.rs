use std::sync::Arc;

use backend::{ApiConfig, Backend, ModuleApi};
use learn_core::model::{Module, ModuleId};
use tracing::info;

use crate::error::AppServicesError;
use crate::learning_service::LearningService;
use crate::progress_store::ProgressStore;

/// Assembles app-facing services around one shared progress store.
#[derive(Clone)]
pub struct AppServices {
    modules: Arc<dyn ModuleApi>,
    store: ProgressStore,
    learning: Arc<LearningService>,
}

impl AppServices {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        let store = ProgressStore::new(Arc::clone(&backend.progress));
        let learning = Arc::new(LearningService::new(store.clone()));
        Self {
            modules: backend.modules,
            store,
            learning,
        }
    }

    /// Build services talking to the REST backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the HTTP client cannot be built.
    pub fn from_config(config: ApiConfig) -> Result<Self, AppServicesError> {
        info!(base_url = %config.base_url, "using REST backend");
        Ok(Self::new(Backend::http(config)?))
    }

    /// Hydrate learner progress; call once per session.
    ///
    /// Returns whether progress could be fetched. A failure leaves the store empty.
    pub async fn start_session(&self) -> bool {
        self.store.load_all().await
    }

    /// Fetch a module for display or navigation.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Api` if the module cannot be fetched.
    pub async fn open_module(&self, id: &ModuleId) -> Result<Module, AppServicesError> {
        Ok(self.modules.get_module(id).await?)
    }

    /// List modules available to the learner.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Api` if the list cannot be fetched.
    pub async fn list_modules(&self) -> Result<Vec<Module>, AppServicesError> {
        Ok(self.modules.list_modules().await?)
    }

    #[must_use]
    pub fn modules(&self) -> Arc<dyn ModuleApi> {
        Arc::clone(&self.modules)
    }

    #[must_use]
    pub fn store(&self) -> ProgressStore {
        self.store.clone()
    }

    #[must_use]
    pub fn learning(&self) -> Arc<LearningService> {
        Arc::clone(&self.learning)
    }
}
