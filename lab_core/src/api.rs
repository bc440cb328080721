//! Public API surface for the analysis-service exchange.
//!
//! This file consolidates the DTO types sent to and received from the remote
//! analysis service. All types derive Serialize/Deserialize for JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{CategoryMap, DataType, DataUnit, Gender, TimestampFormat};

/// A file accepted by `bulk_upload`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_id: String,
    pub filename: String,
}

/// Response body of `bulk_upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

/// Verdict of `validate_bulk_columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVerdict {
    pub valid: bool,
    #[serde(default)]
    pub message: String,
}

impl SchemaVerdict {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// First rows of a file, for display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePreview {
    #[serde(default)]
    pub preview: Vec<serde_json::Value>,
}

/// One sample of the minute-level ENMO series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnmoPoint {
    pub timestamp: String,
    #[serde(default)]
    pub enmo: Option<f64>,
}

impl EnmoPoint {
    /// Timestamp as UTC, accepting RFC 3339 and `YYYY-MM-DD HH:MM:SS[.f]`.
    pub fn parsed_timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(ts.with_timezone(&chrono::Utc));
        }
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(&self.timestamp, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

/// Features extracted from one successfully processed file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerFileResult {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub features: CategoryMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enmo_timeseries: Option<Vec<EnmoPoint>>,
}

impl PerFileResult {
    /// The ENMO series when the service sent a non-empty one.
    pub fn enmo_series(&self) -> Option<&[EnmoPoint]> {
        self.enmo_timeseries
            .as_deref()
            .filter(|series| !series.is_empty())
    }
}

/// A file that could not even be loaded (handler construction failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub error: String,
}

/// A file that loaded but failed during feature extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FailedHandlerRepr")]
pub struct FailedHandler {
    pub index: usize,
    pub error: String,
}

/// The service reports processing failures either as `[index, error]`
/// pairs or as `{index, error}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum FailedHandlerRepr {
    Pair(usize, String),
    Object {
        index: usize,
        #[serde(default)]
        error: String,
    },
}

impl From<FailedHandlerRepr> for FailedHandler {
    fn from(repr: FailedHandlerRepr) -> Self {
        match repr {
            FailedHandlerRepr::Pair(index, error) => Self { index, error },
            FailedHandlerRepr::Object { index, error } => Self { index, error },
        }
    }
}

/// One row of the server-computed summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub feature: String,
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub std: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub median: Option<f64>,
}

/// Feature × feature → coefficient. Missing coefficients arrive as `null`.
pub type CorrelationMatrix = IndexMap<String, IndexMap<String, Option<f64>>>;

/// Response body of `bulk_process`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub individual_results: Vec<PerFileResult>,
    #[serde(default)]
    pub failed_files: Vec<FailedFile>,
    #[serde(default)]
    pub failed_handlers: Vec<FailedHandler>,
    #[serde(default)]
    pub summary_dataframe: Vec<SummaryRow>,
    #[serde(default)]
    pub correlation_matrix: CorrelationMatrix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
}

impl BatchResult {
    /// Canonical feature names in summary order.
    pub fn summary_features(&self) -> Vec<String> {
        self.summary_dataframe
            .iter()
            .map(|row| row.feature.clone())
            .collect()
    }

    /// Results that carry a non-empty ENMO series.
    pub fn files_with_enmo(&self) -> impl Iterator<Item = &PerFileResult> {
        self.individual_results
            .iter()
            .filter(|result| result.enmo_series().is_some())
    }
}

/// Preprocessing parameters, forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessArgs {
    pub autocalib_sd_criter: f64,
    pub autocalib_sphere_crit: f64,
    pub filter_type: String,
    pub filter_cutoff: f64,
    pub wear_sd_criter: f64,
    pub wear_range_crit: f64,
    pub wear_window_length: f64,
    pub wear_window_skip: f64,
    pub required_daily_coverage: f64,
}

impl Default for PreprocessArgs {
    fn default() -> Self {
        Self {
            autocalib_sd_criter: 0.00013,
            autocalib_sphere_crit: 0.02,
            filter_type: "lowpass".to_string(),
            filter_cutoff: 2.0,
            wear_sd_criter: 0.00013,
            wear_range_crit: 0.00067,
            wear_window_length: 45.0,
            wear_window_skip: 7.0,
            required_daily_coverage: 0.5,
        }
    }
}

/// Feature-extraction parameters, forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureArgs {
    pub sleep_rescore: bool,
    pub sleep_ck_sf: f64,
    pub pa_cutpoint_sl: f64,
    pub pa_cutpoint_lm: f64,
    pub pa_cutpoint_mv: f64,
}

impl Default for FeatureArgs {
    fn default() -> Self {
        Self {
            sleep_rescore: true,
            sleep_ck_sf: 0.0025,
            pa_cutpoint_sl: 15.0,
            pa_cutpoint_lm: 35.0,
            pa_cutpoint_mv: 70.0,
        }
    }
}

/// Per-file entry of the `bulk_process` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProcessConfig {
    pub file_id: String,
    pub data_type: DataType,
    pub data_unit: Option<DataUnit>,
    #[serde(alias = "timestamp_format")]
    pub time_format: TimestampFormat,
    pub time_column: String,
    pub data_columns: Vec<String>,
}

/// Age input as sent to the service (age already parsed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosinorAgePayload {
    pub file_id: String,
    pub age: f64,
    pub gender: Gender,
}

/// Request body of `bulk_process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub files: Vec<FileProcessConfig>,
    pub preprocess_args: PreprocessArgs,
    pub features_args: FeatureArgs,
    pub enable_cosinorage: bool,
    pub cosinor_age_inputs: Vec<CosinorAgePayload>,
}
