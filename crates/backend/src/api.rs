use async_trait::async_trait;
use chrono::Utc;
use learn_core::model::{
    CompletedItem, ItemId, ModelError, Module, ModuleId, ProgressSnapshot, UnitId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("request failed with status {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    #[error("base url cannot carry path segments")]
    CannotBeABase,

    #[error("malformed module: {0}")]
    Model(#[from] ModelError),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Read access to course structure.
#[async_trait]
pub trait ModuleApi: Send + Sync {
    /// List every module visible to the learner.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend cannot be reached or answers badly.
    async fn list_modules(&self) -> Result<Vec<Module>, ApiError>;

    /// Fetch a module with its units and items.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if missing, or other backend errors.
    async fn get_module(&self, id: &ModuleId) -> Result<Module, ApiError>;
}

/// Learner progress as recorded by the backend.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    /// Fetch progress for every module the learner has touched.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend cannot be reached or answers badly.
    async fn get_all_progress(&self) -> Result<Vec<ProgressSnapshot>, ApiError>;

    /// Fetch progress for a single module.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the learner has no record, or other backend errors.
    async fn get_progress(&self, module_id: &ModuleId) -> Result<ProgressSnapshot, ApiError>;

    /// Record an item as completed.
    ///
    /// `Ok(None)` means the backend answered without confirming the update.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    async fn mark_item_complete(
        &self,
        module_id: &ModuleId,
        unit_id: &UnitId,
        item_id: &ItemId,
    ) -> Result<Option<ProgressSnapshot>, ApiError>;
}

/// Simple in-memory backend for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    modules: Arc<Mutex<HashMap<ModuleId, Module>>>,
    progress: Arc<Mutex<HashMap<ModuleId, ProgressSnapshot>>>,
    fail_progress: Arc<AtomicBool>,
    fail_marks: Arc<AtomicBool>,
    reject_marks: Arc<AtomicBool>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a module.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backing lock is poisoned.
    pub fn insert_module(&self, module: Module) -> Result<(), ApiError> {
        let mut guard = self
            .modules
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        guard.insert(module.id().clone(), module);
        Ok(())
    }

    /// Seed the recorded progress for a module.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backing lock is poisoned.
    pub fn set_progress(&self, snapshot: ProgressSnapshot) -> Result<(), ApiError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        guard.insert(snapshot.module_id.clone(), snapshot);
        Ok(())
    }

    /// Make progress reads fail with `ApiError::Unavailable`.
    pub fn fail_progress_reads(&self, fail: bool) {
        self.fail_progress.store(fail, Ordering::SeqCst);
    }

    /// Make mark-complete calls fail with `ApiError::Unavailable`.
    pub fn fail_marks(&self, fail: bool) {
        self.fail_marks.store(fail, Ordering::SeqCst);
    }

    /// Make mark-complete calls answer `Ok(None)`.
    pub fn reject_marks(&self, reject: bool) {
        self.reject_marks.store(reject, Ordering::SeqCst);
    }

    fn check_progress_reads(&self) -> Result<(), ApiError> {
        if self.fail_progress.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("progress reads disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ModuleApi for InMemoryBackend {
    async fn list_modules(&self) -> Result<Vec<Module>, ApiError> {
        let guard = self
            .modules
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        let mut modules: Vec<Module> = guard.values().cloned().collect();
        modules.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(modules)
    }

    async fn get_module(&self, id: &ModuleId) -> Result<Module, ApiError> {
        let guard = self
            .modules
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        guard.get(id).cloned().ok_or(ApiError::NotFound)
    }
}

#[async_trait]
impl ProgressApi for InMemoryBackend {
    async fn get_all_progress(&self) -> Result<Vec<ProgressSnapshot>, ApiError> {
        self.check_progress_reads()?;
        let guard = self
            .progress
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn get_progress(&self, module_id: &ModuleId) -> Result<ProgressSnapshot, ApiError> {
        self.check_progress_reads()?;
        let guard = self
            .progress
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        guard.get(module_id).cloned().ok_or(ApiError::NotFound)
    }

    async fn mark_item_complete(
        &self,
        module_id: &ModuleId,
        unit_id: &UnitId,
        item_id: &ItemId,
    ) -> Result<Option<ProgressSnapshot>, ApiError> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("mark complete disabled".into()));
        }
        if self.reject_marks.load(Ordering::SeqCst) {
            return Ok(None);
        }

        {
            let modules = self
                .modules
                .lock()
                .map_err(|e| ApiError::Unavailable(e.to_string()))?;
            let module = modules.get(module_id).ok_or(ApiError::NotFound)?;
            if module.locate(unit_id, item_id).is_none() {
                return Err(ApiError::NotFound);
            }
        }

        let mut guard = self
            .progress
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        let snapshot = guard
            .entry(module_id.clone())
            .or_insert_with(|| ProgressSnapshot::new(module_id.clone(), Vec::new()));
        if !snapshot.completed_item_ids().any(|id| id == item_id) {
            snapshot.completed_items.push(CompletedItem {
                item_id: item_id.clone(),
                unit_id: Some(unit_id.clone()),
                completed_at: Some(Utc::now()),
            });
        }
        Ok(Some(snapshot.clone()))
    }
}

/// Aggregates module and progress collaborators behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Backend {
    pub modules: Arc<dyn ModuleApi>,
    pub progress: Arc<dyn ProgressApi>,
}

impl Backend {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryBackend::new())
    }

    /// Share an existing in-memory backend, keeping a handle for seeding.
    #[must_use]
    pub fn from_in_memory(backend: &InMemoryBackend) -> Self {
        let modules: Arc<dyn ModuleApi> = Arc::new(backend.clone());
        let progress: Arc<dyn ProgressApi> = Arc::new(backend.clone());
        Self { modules, progress }
    }
}
