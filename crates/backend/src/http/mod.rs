use std::env;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use learn_core::model::{ItemId, Module, ModuleId, ProgressSnapshot, UnitId};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::api::{ApiError, Backend, ModuleApi, ProgressApi};

mod wire;

use wire::{MarkCompleteRequest, MarkCompleteResponse};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the REST backend.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Build a config for the given base URL with default timeout and no token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the URL cannot be parsed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: Url::parse(base_url.trim())?,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Read `LEARN_API_URL`, `LEARN_API_TOKEN` and `LEARN_API_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `LEARN_API_URL` is set but malformed.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = env::var("LEARN_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::from_env_with_base_url(&base_url)
    }

    /// Like [`ApiConfig::from_env`], but with an explicit base URL.
    ///
    /// `LEARN_API_URL` is not read, so a malformed value there does not matter.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `base_url` cannot be parsed.
    pub fn from_env_with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let token = env::var("LEARN_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        let timeout = env::var("LEARN_API_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self::new(base_url)?
            .with_token(token)
            .with_timeout(Duration::from_secs(timeout)))
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `reqwest`-backed implementation of the module and progress APIs.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: ApiConfig,
}

impl HttpBackend {
    /// Build a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be constructed.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::CannotBeABase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            warn!(%status, url = %response.url(), "backend request failed");
            return Err(ApiError::Status(status));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ModuleApi for HttpBackend {
    async fn list_modules(&self) -> Result<Vec<Module>, ApiError> {
        let url = self.endpoint(&["api", "modules"])?;
        debug!(%url, "listing modules");
        let modules: Vec<Module> = self.send(self.client.get(url)).await?;
        Ok(modules
            .into_iter()
            .filter(|module| match module.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!(module_id = %module.id(), error = %err, "skipping malformed module");
                    false
                }
            })
            .collect())
    }

    async fn get_module(&self, id: &ModuleId) -> Result<Module, ApiError> {
        let url = self.endpoint(&["api", "modules", id.as_str()])?;
        debug!(%url, "fetching module");
        let module: Module = self.send(self.client.get(url)).await?;
        module.validate()?;
        Ok(module)
    }
}

#[async_trait]
impl ProgressApi for HttpBackend {
    async fn get_all_progress(&self) -> Result<Vec<ProgressSnapshot>, ApiError> {
        let url = self.endpoint(&["api", "progress"])?;
        debug!(%url, "fetching all progress");
        self.send(self.client.get(url)).await
    }

    async fn get_progress(&self, module_id: &ModuleId) -> Result<ProgressSnapshot, ApiError> {
        let url = self.endpoint(&["api", "progress", module_id.as_str()])?;
        debug!(%url, "fetching module progress");
        self.send(self.client.get(url)).await
    }

    async fn mark_item_complete(
        &self,
        module_id: &ModuleId,
        unit_id: &UnitId,
        item_id: &ItemId,
    ) -> Result<Option<ProgressSnapshot>, ApiError> {
        let url = self.endpoint(&["api", "progress", module_id.as_str(), "complete"])?;
        debug!(%url, %item_id, "marking item complete");
        let body = MarkCompleteRequest { unit_id, item_id };
        let response: Option<MarkCompleteResponse> =
            self.send(self.client.post(url).json(&body)).await?;
        Ok(response.and_then(|r| r.progress))
    }
}

impl Backend {
    /// Build a `Backend` talking to the REST API described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP client cannot be constructed.
    pub fn http(config: ApiConfig) -> Result<Self, ApiError> {
        let http = HttpBackend::new(config)?;
        let modules: Arc<dyn ModuleApi> = Arc::new(http.clone());
        let progress: Arc<dyn ProgressApi> = Arc::new(http);
        Ok(Self { modules, progress })
    }
}
