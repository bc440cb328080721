//! Remote analysis-service layer.
//!
//! # Module Organization
//!
//! - [`service`]: The [`AnalysisService`] trait and upload types
//! - [`error`]: Error types for service operations
//! - [`config`]: TOML / environment configuration
//! - `http`: reqwest implementation (feature `http-client`)
//! - `local`: in-memory implementation (feature `local-service`)

pub mod config;
pub mod error;
pub mod service;

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "local-service")]
pub mod local;

pub use config::LabConfig;
pub use error::{ErrorContext, ServiceError, ServiceResult};
pub use service::{no_progress, AnalysisService, ProgressFn, UploadSource};

#[cfg(feature = "http-client")]
pub use http::HttpAnalysisService;

#[cfg(feature = "local-service")]
pub use local::LocalAnalysisService;
