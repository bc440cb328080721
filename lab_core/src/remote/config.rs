//! Lab configuration file and environment handling.
//!
//! Settings are read from a TOML file and can be overridden by environment
//! variables:
//!
//! - `COSINOR_API_URL`: base URL of the analysis service
//! - `COSINOR_TIMEOUT_SECS`: request timeout in seconds

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::ServiceError;
use crate::api::{FeatureArgs, PreprocessArgs};

/// Complete lab configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub preprocess: PreprocessArgs,
    #[serde(default)]
    pub features: FeatureArgs,
    #[serde(default)]
    pub batch: BatchSettings,
}

/// Analysis-service connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Defaults for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    #[serde(default)]
    pub enable_cosinorage: bool,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

// bulk processing of many files routinely takes minutes
fn default_timeout_secs() -> u64 {
    900
}

impl LabConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ServiceError::configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ServiceError> {
        let config: LabConfig = toml::from_str(content).map_err(|e| {
            ServiceError::configuration(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// First existing `cosinor-lab.toml` among the standard locations
    /// relative to `base`:
    /// 1. `base` itself
    /// 2. `base/lab_core/`
    /// 3. The parent of `base`
    pub fn find_default_file(base: &Path) -> Option<PathBuf> {
        [
            base.join("cosinor-lab.toml"),
            base.join("lab_core").join("cosinor-lab.toml"),
            base.join("..").join("cosinor-lab.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load configuration from the default location under the current
    /// directory.
    pub fn from_default_location() -> Result<Self, ServiceError> {
        match Self::find_default_file(Path::new(".")) {
            Some(path) => Self::from_file(path),
            None => Err(ServiceError::configuration(
                "No cosinor-lab.toml found in standard locations",
            )),
        }
    }

    /// [`load_from`](Self::load_from) relative to the current directory.
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        Self::load_from(path, Path::new("."))
    }

    /// Explicit file, else the default file under `base`, else built-in
    /// defaults; environment overrides are applied last. A default file that
    /// exists but cannot be read or parsed is an error.
    pub fn load_from(path: Option<&Path>, base: &Path) -> Result<Self, ServiceError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| Self::find_default_file(base));
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `COSINOR_API_URL` and `COSINOR_TIMEOUT_SECS` when set.
    pub fn apply_env_overrides(&mut self) -> Result<(), ServiceError> {
        if let Ok(url) = env::var("COSINOR_API_URL") {
            if !url.trim().is_empty() {
                self.service.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(timeout) = env::var("COSINOR_TIMEOUT_SECS") {
            self.service.timeout_secs = timeout.trim().parse().map_err(|_| {
                ServiceError::configuration("COSINOR_TIMEOUT_SECS must be a whole number of seconds")
            })?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ServiceError> {
        let url = self.service.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ServiceError::configuration(format!(
                "service.api_base_url must be an http(s) URL, got '{}'",
                self.service.api_base_url
            )));
        }
        if self.service.timeout_secs == 0 {
            return Err(ServiceError::configuration(
                "service.timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Full URL of an endpoint, tolerating slashes on either side.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.service.api_base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}
