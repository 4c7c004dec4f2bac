#![forbid(unsafe_code)]

pub mod api;
pub mod http;

pub use api::{ApiError, Backend, InMemoryBackend, ModuleApi, ProgressApi};
pub use http::{ApiConfig, HttpBackend};
