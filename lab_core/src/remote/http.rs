//! reqwest-backed [`AnalysisService`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::config::LabConfig;
use super::error::{ErrorContext, ServiceError, ServiceResult};
use super::service::{AnalysisService, ProgressFn, UploadSource};
use crate::api::{
    BatchResult, FilePreview, ProcessRequest, SchemaVerdict, UploadResponse, UploadedFile,
};

/// Size of the chunks the upload body is streamed in. Progress is reported
/// once per chunk.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Analysis service reached over HTTP.
#[derive(Clone)]
pub struct HttpAnalysisService {
    client: Client,
    config: LabConfig,
}

impl HttpAnalysisService {
    pub fn new(config: LabConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.service.timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    async fn send(
        &self,
        operation: &str,
        endpoint: &str,
        request: RequestBuilder,
    ) -> ServiceResult<Response> {
        let context = ErrorContext::new(operation).with_endpoint(endpoint);
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::transport(e.to_string(), context.clone()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::status(
            status.as_u16(),
            error_detail(&body, &status.to_string()),
            context.with_details(format!("status {}", status)),
        ))
    }

    async fn decode<T: DeserializeOwned>(
        operation: &str,
        endpoint: &str,
        response: Response,
    ) -> ServiceResult<T> {
        let context = ErrorContext::new(operation).with_endpoint(endpoint);
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::transport(e.to_string(), context.clone()))?;

        let deserializer = &mut serde_json::Deserializer::from_slice(&body);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            let path = e.path().to_string();
            ServiceError::decode(e.into_inner().to_string(), context.with_details(format!("at {}", path)))
        })
    }
}

/// Human-readable error text from a failed response: the `detail` field
/// when the body is JSON carrying one, else the body, else the status line.
pub(crate) fn error_detail(body: &str, status_line: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(detail) if !detail.is_null() => return detail.to_string(),
            _ => {}
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status_line.to_string()
    } else {
        trimmed.to_string()
    }
}

fn percent(sent: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (sent as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// Stream one file's bytes, reporting cumulative progress over the whole
/// request. `offset` is the number of bytes of the files sent before it.
fn upload_part(file: UploadSource, offset: u64, total: u64, progress: ProgressFn) -> Part {
    let length = file.bytes.len() as u64;
    let bytes = file.bytes;
    let stream = async_stream::stream! {
        let mut sent = offset;
        for chunk in bytes.chunks(UPLOAD_CHUNK_SIZE) {
            sent += chunk.len() as u64;
            progress(percent(sent, total));
            yield Ok::<Vec<u8>, std::io::Error>(chunk.to_vec());
        }
    };
    Part::stream_with_length(Body::wrap_stream(stream), length).file_name(file.filename)
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn bulk_upload(
        &self,
        files: Vec<UploadSource>,
        progress: ProgressFn,
    ) -> ServiceResult<Vec<UploadedFile>> {
        let total: u64 = files.iter().map(|f| f.bytes.len() as u64).sum();
        debug!(files = files.len(), bytes = total, "Uploading batch");

        let mut form = Form::new();
        let mut offset = 0u64;
        for file in files {
            let length = file.bytes.len() as u64;
            form = form.part("files", upload_part(file, offset, total, progress.clone()));
            offset += length;
        }

        let endpoint = self.config.endpoint_url("bulk_upload");
        let response = self
            .send("bulk_upload", &endpoint, self.client.post(&endpoint).multipart(form))
            .await?;
        let body: UploadResponse = Self::decode("bulk_upload", &endpoint, response).await?;
        progress(100.0);
        Ok(body.files)
    }

    async fn get_columns(&self, file_id: &str) -> ServiceResult<Vec<String>> {
        let endpoint = self.config.endpoint_url(&format!("get_columns/{}", file_id));
        let response = self
            .send("get_columns", &endpoint, self.client.get(&endpoint))
            .await?;
        Self::decode("get_columns", &endpoint, response).await
    }

    async fn preview(&self, file_id: &str) -> ServiceResult<FilePreview> {
        let endpoint = self.config.endpoint_url(&format!("preview/{}", file_id));
        let response = self
            .send("preview", &endpoint, self.client.get(&endpoint))
            .await?;
        Self::decode("preview", &endpoint, response).await
    }

    async fn validate_bulk_columns(&self, file_ids: &[String]) -> ServiceResult<SchemaVerdict> {
        let endpoint = self.config.endpoint_url("validate_bulk_columns");
        let response = self
            .send(
                "validate_bulk_columns",
                &endpoint,
                self.client.post(&endpoint).json(file_ids),
            )
            .await?;
        Self::decode("validate_bulk_columns", &endpoint, response).await
    }

    async fn bulk_process(&self, request: &ProcessRequest) -> ServiceResult<BatchResult> {
        let endpoint = self.config.endpoint_url("bulk_process");
        let response = self
            .send("bulk_process", &endpoint, self.client.post(&endpoint).json(request))
            .await?;
        Self::decode("bulk_process", &endpoint, response).await
    }

    async fn clear_all_state(&self) -> ServiceResult<()> {
        let endpoint = self.config.endpoint_url("clear_all_state");
        self.send("clear_all_state", &endpoint, self.client.post(&endpoint))
            .await?;
        Ok(())
    }
}
