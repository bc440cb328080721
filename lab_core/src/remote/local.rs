//! In-memory analysis service.
//!
//! Suitable for unit testing and offline development: uploads are kept in
//! memory, schemas are compared from the CSV header line, and the
//! `bulk_process` response is scripted by the caller. Every call is recorded so
//! tests can assert which endpoints were contacted.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ErrorContext, ServiceError, ServiceResult};
use super::service::{AnalysisService, ProgressFn, UploadSource};
use crate::api::{
    BatchResult, FilePreview, PerFileResult, ProcessRequest, SchemaVerdict, UploadedFile,
};

/// Rows returned by `preview`.
const PREVIEW_ROWS: usize = 5;

/// A file held by the in-memory service.
#[derive(Debug, Clone)]
struct StoredFile {
    filename: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Default)]
struct LocalData {
    files: IndexMap<String, StoredFile>,
    calls: Vec<String>,
    /// operation → (status, message) for the next call of that operation
    failures: HashMap<String, (u16, String)>,
    verdict_override: Option<SchemaVerdict>,
    process_result: Option<BatchResult>,
    last_process_request: Option<ProcessRequest>,
    clear_count: usize,
}

/// In-memory [`AnalysisService`].
///
/// # Example
/// ```
/// use cosinor_lab::remote::{AnalysisService, LocalAnalysisService, UploadSource, no_progress};
///
/// # tokio_test_block(async {
/// let service = LocalAnalysisService::new();
/// let files = service
///     .bulk_upload(vec![UploadSource::new("a.csv", "timestamp,x,y,z\n")], no_progress())
///     .await
///     .unwrap();
/// assert_eq!(files[0].filename, "a.csv");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct LocalAnalysisService {
    data: Arc<RwLock<LocalData>>,
}

/// Header and records of an uploaded CSV file. Ragged rows are kept as-is.
fn parse_csv(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<String>>), csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let columns = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()?;
    Ok((columns, rows))
}

impl LocalAnalysisService {
    /// Create a new empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail with the given status and detail.
    pub fn fail_next(&self, operation: &str, status: u16, message: impl Into<String>) {
        self.data
            .write()
            .failures
            .insert(operation.to_string(), (status, message.into()));
    }

    /// Answer every schema validation with `verdict` instead of comparing headers.
    pub fn set_schema_verdict(&self, verdict: SchemaVerdict) {
        self.data.write().verdict_override = Some(verdict);
    }

    /// Response of subsequent `bulk_process` calls.
    pub fn set_process_result(&self, result: BatchResult) {
        self.data.write().process_result = Some(result);
    }

    /// Operations called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.data.read().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.data.read().calls.iter().filter(|c| *c == operation).count()
    }

    pub fn last_process_request(&self) -> Option<ProcessRequest> {
        self.data.read().last_process_request.clone()
    }

    pub fn stored_file_count(&self) -> usize {
        self.data.read().files.len()
    }

    pub fn clear_count(&self) -> usize {
        self.data.read().clear_count
    }

    /// Record the call and fire a scripted failure if one is pending.
    fn enter(&self, operation: &str) -> ServiceResult<()> {
        let mut data = self.data.write();
        data.calls.push(operation.to_string());
        match data.failures.remove(operation) {
            Some((status, message)) => Err(ServiceError::status(
                status,
                message,
                ErrorContext::new(operation),
            )),
            None => Ok(()),
        }
    }

    fn stored(&self, operation: &str, file_id: &str) -> ServiceResult<StoredFile> {
        self.data.read().files.get(file_id).cloned().ok_or_else(|| {
            ServiceError::status(
                404,
                format!("File {} not found", file_id),
                ErrorContext::new(operation),
            )
        })
    }

    /// Default `bulk_process` answer: every file succeeds with no features.
    fn default_result(&self, request: &ProcessRequest) -> BatchResult {
        let data = self.data.read();
        BatchResult {
            individual_results: request
                .files
                .iter()
                .map(|file| PerFileResult {
                    filename: data
                        .files
                        .get(&file.file_id)
                        .map(|stored| stored.filename.clone())
                        .unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            total_files: Some(request.files.len()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AnalysisService for LocalAnalysisService {
    async fn bulk_upload(
        &self,
        files: Vec<UploadSource>,
        progress: ProgressFn,
    ) -> ServiceResult<Vec<UploadedFile>> {
        self.enter("bulk_upload")?;

        let count = files.len();
        let mut uploaded = Vec::with_capacity(count);
        for (i, file) in files.into_iter().enumerate() {
            let (columns, rows) = parse_csv(&file.bytes).map_err(|e| {
                ServiceError::status(
                    400,
                    format!("Could not read {} as CSV: {}", file.filename, e),
                    ErrorContext::new("bulk_upload"),
                )
            })?;
            let file_id = Uuid::new_v4().to_string();
            self.data.write().files.insert(
                file_id.clone(),
                StoredFile {
                    filename: file.filename.clone(),
                    columns,
                    rows,
                },
            );
            uploaded.push(UploadedFile {
                file_id,
                filename: file.filename,
            });
            progress((i + 1) as f64 / count as f64 * 100.0);
        }
        progress(100.0);
        Ok(uploaded)
    }

    async fn get_columns(&self, file_id: &str) -> ServiceResult<Vec<String>> {
        self.enter("get_columns")?;
        Ok(self.stored("get_columns", file_id)?.columns)
    }

    async fn preview(&self, file_id: &str) -> ServiceResult<FilePreview> {
        self.enter("preview")?;
        let stored = self.stored("preview", file_id)?;
        let preview = stored
            .rows
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = stored
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(column, cell)| (column.clone(), serde_json::Value::String(cell.clone())))
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect();
        Ok(FilePreview { preview })
    }

    async fn validate_bulk_columns(&self, file_ids: &[String]) -> ServiceResult<SchemaVerdict> {
        self.enter("validate_bulk_columns")?;
        if let Some(verdict) = self.data.read().verdict_override.clone() {
            return Ok(verdict);
        }

        let mut reference: Option<StoredFile> = None;
        for file_id in file_ids {
            let stored = self.stored("validate_bulk_columns", file_id)?;
            match &reference {
                None => reference = Some(stored),
                Some(first) if first.columns != stored.columns => {
                    return Ok(SchemaVerdict::invalid(format!(
                        "File '{}' has columns [{}] but '{}' has [{}]",
                        stored.filename,
                        stored.columns.join(", "),
                        first.filename,
                        first.columns.join(", ")
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(SchemaVerdict::valid(format!(
            "All {} files have identical column structures",
            file_ids.len()
        )))
    }

    async fn bulk_process(&self, request: &ProcessRequest) -> ServiceResult<BatchResult> {
        self.enter("bulk_process")?;
        self.data.write().last_process_request = Some(request.clone());
        let scripted = self.data.read().process_result.clone();
        Ok(scripted.unwrap_or_else(|| self.default_result(request)))
    }

    async fn clear_all_state(&self) -> ServiceResult<()> {
        self.enter("clear_all_state")?;
        let mut data = self.data.write();
        data.files.clear();
        data.clear_count += 1;
        Ok(())
    }
}
