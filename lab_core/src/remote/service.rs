//! The analysis-service trait.
//!
//! All biomarker computation happens behind this seam. The batch controller
//! only talks to `dyn AnalysisService`, which keeps it testable against the
//! in-memory implementation.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::error::{ServiceError, ServiceResult};
use crate::api::{BatchResult, FilePreview, ProcessRequest, SchemaVerdict, UploadedFile};

/// Receives upload progress as a percentage in `[0, 100]`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// A progress sink that ignores every update.
pub fn no_progress() -> ProgressFn {
    Arc::new(|_| {})
}

/// One recording selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadSource {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a recording from disk; the file name becomes the upload name.
    pub async fn from_path(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| ServiceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// Remote analysis service.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload every file in one multipart request.
    ///
    /// `progress` is invoked while the body is transferred and once with 100
    /// when the service accepted the upload.
    async fn bulk_upload(
        &self,
        files: Vec<UploadSource>,
        progress: ProgressFn,
    ) -> ServiceResult<Vec<UploadedFile>>;

    /// Column names of one uploaded file.
    async fn get_columns(&self, file_id: &str) -> ServiceResult<Vec<String>>;

    /// First rows of one uploaded file.
    async fn preview(&self, file_id: &str) -> ServiceResult<FilePreview>;

    /// Whether all listed files share one column schema.
    async fn validate_bulk_columns(&self, file_ids: &[String]) -> ServiceResult<SchemaVerdict>;

    /// Run preprocessing and feature extraction for the whole batch.
    async fn bulk_process(&self, request: &ProcessRequest) -> ServiceResult<BatchResult>;

    /// Drop every uploaded artifact held by the service.
    async fn clear_all_state(&self) -> ServiceResult<()>;
}
