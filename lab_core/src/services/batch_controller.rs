//! Orchestrates one batch from upload to result.
//!
//! The controller owns the only [`BatchState`] and drives it through
//! [`reduce`] with the outcome of every remote call. All mutating operations
//! take `&mut self`, so a second upload or submission cannot start while one
//! is outstanding.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::batch_outcome::BatchOutcome;
use super::batch_state::{reduce, BatchEvent, BatchState, ConfiguredBatch, TransitionError};
use super::column_defaults::default_column_selection;
use super::correlation::{heatmap, Heatmap};
use super::cosinorage_gate::{self, GateStatus};
use super::distributions::{distributions_for, FeatureDistributions};
use super::schema_validator;
use crate::api::{
    BatchResult, CosinorAgePayload, FeatureArgs, FileProcessConfig, PreprocessArgs,
    ProcessRequest, UploadedFile,
};
use crate::models::{BatchConfig, ConfigDraft, ConfigError, CosinorAgeInput, DataType, Gender};
use crate::remote::{AnalysisService, LabConfig, ProgressFn, ServiceError, UploadSource};

/// Why a controller operation did not go through.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The files do not share one schema, or that could not be checked.
    #[error("{0}")]
    SchemaRejected(String),

    #[error(transparent)]
    IncompleteConfig(#[from] ConfigError),

    #[error("{}", .0.describe())]
    CosinorageGate(GateStatus),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("File {0} is not part of the batch")]
    UnknownFile(String),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

pub struct BatchController {
    service: Arc<dyn AnalysisService>,
    state: BatchState,
    draft: ConfigDraft,
    cosinor_inputs: Vec<CosinorAgeInput>,
    enable_cosinorage: bool,
    preprocess_args: PreprocessArgs,
    feature_args: FeatureArgs,
    default_preprocess_args: PreprocessArgs,
    default_feature_args: FeatureArgs,
    last_error: Option<String>,
    last_message: Option<String>,
}

impl BatchController {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            state: BatchState::Empty,
            draft: ConfigDraft::default(),
            cosinor_inputs: Vec::new(),
            enable_cosinorage: false,
            preprocess_args: PreprocessArgs::default(),
            feature_args: FeatureArgs::default(),
            default_preprocess_args: PreprocessArgs::default(),
            default_feature_args: FeatureArgs::default(),
            last_error: None,
            last_message: None,
        }
    }

    /// Controller whose parameters default to the configured ones.
    pub fn from_config(service: Arc<dyn AnalysisService>, config: &LabConfig) -> Self {
        let mut controller = Self::new(service);
        controller.default_preprocess_args = config.preprocess.clone();
        controller.default_feature_args = config.features.clone();
        controller.preprocess_args = config.preprocess.clone();
        controller.feature_args = config.features.clone();
        controller.enable_cosinorage = config.batch.enable_cosinorage;
        controller
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn files(&self) -> &[UploadedFile] {
        self.state.files()
    }

    pub fn columns(&self) -> &[String] {
        self.state.columns()
    }

    pub fn draft(&self) -> &ConfigDraft {
        &self.draft
    }

    pub fn config(&self) -> Option<&BatchConfig> {
        self.state.config()
    }

    pub fn cosinor_inputs(&self) -> &[CosinorAgeInput] {
        &self.cosinor_inputs
    }

    pub fn cosinorage_enabled(&self) -> bool {
        self.enable_cosinorage
    }

    pub fn preprocess_args(&self) -> &PreprocessArgs {
        &self.preprocess_args
    }

    pub fn feature_args(&self) -> &FeatureArgs {
        &self.feature_args
    }

    /// Error of the last failed step, for display.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Informational message of the last step (validation verdict, run summary).
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn result(&self) -> Option<&BatchResult> {
        self.state.result()
    }

    pub fn outcome(&self) -> Option<BatchOutcome> {
        self.result()
            .map(|result| BatchOutcome::from_result(result, self.files().len()))
    }

    pub fn gate_status(&self) -> GateStatus {
        cosinorage_gate::status_for(self.files(), &self.cosinor_inputs, self.enable_cosinorage)
    }

    /// Distribution panels of the completed run.
    pub fn distributions(&self) -> Option<FeatureDistributions> {
        self.result().map(distributions_for)
    }

    pub fn heatmap(&self) -> Option<Heatmap> {
        self.result()
            .filter(|result| !result.correlation_matrix.is_empty())
            .map(|result| heatmap(&result.correlation_matrix))
    }

    fn dispatch(&mut self, event: BatchEvent) -> ControllerResult<()> {
        let name = event.name();
        let next = reduce(&self.state, event)?;
        info!(from = %self.state, to = %next, event = name, "Batch state transition");
        self.state = next;
        Ok(())
    }

    fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(state = %self.state, error = %message, "Batch step failed");
        self.last_error = Some(message);
    }

    /// Drop everything built on the current file set.
    fn discard_batch(&mut self) {
        self.draft = ConfigDraft::default();
        self.cosinor_inputs.clear();
    }

    fn file_ids(&self) -> Vec<String> {
        self.files().iter().map(|f| f.file_id.clone()).collect()
    }

    /// Upload a new batch, validate it and load the column listing.
    ///
    /// On success the batch is `Configuring`. A schema mismatch (or a failed
    /// validation call) discards the uploaded files locally and leaves the
    /// batch `Rejected`.
    pub async fn upload(
        &mut self,
        files: Vec<UploadSource>,
        progress: ProgressFn,
    ) -> ControllerResult<&BatchState> {
        self.dispatch(BatchEvent::UploadStarted {
            file_count: files.len(),
        })?;
        self.last_error = None;
        self.last_message = None;
        self.discard_batch();

        let service = Arc::clone(&self.service);
        let uploaded = match service.bulk_upload(files, progress).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                self.fail(e.user_message());
                self.dispatch(BatchEvent::UploadFailed(e.user_message()))?;
                return Err(e.into());
            }
        };
        info!(files = uploaded.len(), "Upload complete");

        self.dispatch(BatchEvent::UploadSucceeded(uploaded.clone()))?;
        if let BatchState::Rejected { reason } = &self.state {
            let reason = reason.clone();
            self.fail(reason.clone());
            return Err(ControllerError::SchemaRejected(reason));
        }
        self.cosinor_inputs = uploaded.iter().map(CosinorAgeInput::for_file).collect();

        if uploaded.len() >= 2 {
            self.dispatch(BatchEvent::ValidationStarted)?;
            let verdict = schema_validator::validate(&*service, &self.file_ids()).await;
            if !verdict.valid {
                self.discard_batch();
                self.fail(verdict.message.clone());
                self.dispatch(BatchEvent::SchemaRejected(verdict.message.clone()))?;
                return Err(ControllerError::SchemaRejected(verdict.message));
            }
            self.last_message = Some(verdict.message);
        }

        let first = uploaded[0].file_id.clone();
        let columns = match service.get_columns(&first).await {
            Ok(columns) => columns,
            Err(e) => {
                self.fail(format!("Failed to load columns: {}", e.user_message()));
                Vec::new()
            }
        };
        let preview = match service.preview(&first).await {
            Ok(preview) => Some(preview),
            Err(e) => {
                self.fail(format!("Failed to load preview: {}", e.user_message()));
                None
            }
        };
        debug!(columns = columns.len(), "Loaded column listing");

        self.dispatch(BatchEvent::SchemaAccepted { columns, preview })?;
        Ok(&self.state)
    }

    fn ensure_configurable(&self, event: &'static str) -> ControllerResult<()> {
        match self.state {
            BatchState::Configuring(_) | BatchState::Ready(_) => Ok(()),
            _ => Err(TransitionError::NotAllowed {
                state: self.state.name(),
                event,
            }
            .into()),
        }
    }

    /// Choose the data type and propose columns for it.
    ///
    /// The returned draft is stored but not finalized; fill in the unit and
    /// timestamp format and pass it to [`configure`](Self::configure).
    pub fn apply_default_columns(&mut self, data_type: DataType) -> ControllerResult<ConfigDraft> {
        self.ensure_configurable("configured")?;
        let mut draft = self.draft.clone();
        draft.data_type = Some(data_type);
        if let Some(unit) = draft.data_unit {
            if !data_type.allowed_units().contains(&unit) {
                draft.data_unit = None;
            }
        }
        default_column_selection(self.columns(), Some(data_type)).apply_to(&mut draft);
        self.draft = draft.clone();
        Ok(draft)
    }

    /// Store the draft and move to `Ready` when it is complete.
    ///
    /// An incomplete draft reports the first problem; a batch that was
    /// `Ready` drops back to `Configuring`.
    pub fn configure(&mut self, draft: ConfigDraft) -> ControllerResult<&BatchConfig> {
        self.ensure_configurable("configured")?;
        self.draft = draft;
        match self.draft.finalize(self.state.columns()) {
            Ok(config) => {
                self.last_error = None;
                self.dispatch(BatchEvent::Configured(config))?;
                self.state.config().ok_or_else(|| {
                    ControllerError::from(TransitionError::NotAllowed {
                        state: self.state.name(),
                        event: "configured",
                    })
                })
            }
            Err(e) => {
                if matches!(self.state, BatchState::Ready(_)) {
                    self.dispatch(BatchEvent::ConfigInvalidated)?;
                }
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn enable_cosinorage(&mut self, enabled: bool) {
        self.enable_cosinorage = enabled;
    }

    fn input_mut(&mut self, file_id: &str) -> ControllerResult<&mut CosinorAgeInput> {
        self.cosinor_inputs
            .iter_mut()
            .find(|input| input.file_id == file_id)
            .ok_or_else(|| ControllerError::UnknownFile(file_id.to_string()))
    }

    /// Set the age as typed; it is only parsed at submission.
    pub fn set_age(&mut self, file_id: &str, age: impl Into<String>) -> ControllerResult<()> {
        self.input_mut(file_id)?.age = age.into();
        Ok(())
    }

    pub fn set_gender(&mut self, file_id: &str, gender: Option<Gender>) -> ControllerResult<()> {
        self.input_mut(file_id)?.gender = gender;
        Ok(())
    }

    pub fn set_preprocess_args(&mut self, args: PreprocessArgs) {
        self.preprocess_args = args;
    }

    pub fn set_feature_args(&mut self, args: FeatureArgs) {
        self.feature_args = args;
    }

    fn build_request(&self, configured: &ConfiguredBatch) -> ProcessRequest {
        let config = &configured.config;
        let files = configured
            .batch
            .files
            .iter()
            .map(|file| FileProcessConfig {
                file_id: file.file_id.clone(),
                data_type: config.data_type(),
                data_unit: config.data_unit(),
                time_format: config.timestamp_format(),
                time_column: config.time_column().to_string(),
                data_columns: config.data_columns(),
            })
            .collect();

        let cosinor_age_inputs = if self.enable_cosinorage {
            self.cosinor_inputs
                .iter()
                .filter_map(|input| {
                    Some(CosinorAgePayload {
                        file_id: input.file_id.clone(),
                        age: input.parsed_age()?,
                        gender: input.gender?,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        ProcessRequest {
            files,
            preprocess_args: self.preprocess_args.clone(),
            features_args: self.feature_args.clone(),
            enable_cosinorage: self.enable_cosinorage,
            cosinor_age_inputs,
        }
    }

    /// Submit the ready batch.
    ///
    /// The cosinorage gate is checked first without touching the network and
    /// leaves the batch `Ready` when it fails. The schema is then validated
    /// again; a mismatch discards the batch. Any response from the service
    /// completes the batch, even when every file failed inside it.
    pub async fn submit(&mut self) -> ControllerResult<BatchOutcome> {
        let configured = match &self.state {
            BatchState::Ready(configured) => configured.clone(),
            other => {
                return Err(TransitionError::NotAllowed {
                    state: other.name(),
                    event: BatchEvent::SubmitStarted.name(),
                }
                .into())
            }
        };

        let gate = self.gate_status();
        if !gate.is_valid {
            self.fail(gate.describe());
            return Err(ControllerError::CosinorageGate(gate));
        }

        self.dispatch(BatchEvent::SubmitStarted)?;
        self.last_error = None;
        self.last_message = None;

        let service = Arc::clone(&self.service);
        let verdict = schema_validator::validate(&*service, &self.file_ids()).await;
        if !verdict.valid {
            self.discard_batch();
            self.fail(verdict.message.clone());
            self.dispatch(BatchEvent::ProcessFailed {
                error: verdict.message.clone(),
                retain: false,
            })?;
            return Err(ControllerError::SchemaRejected(verdict.message));
        }

        let request = self.build_request(&configured);
        info!(
            files = request.files.len(),
            data_type = %configured.config.data_type(),
            cosinorage = request.enable_cosinorage,
            "Submitting batch"
        );

        match service.bulk_process(&request).await {
            Ok(result) => {
                let outcome = BatchOutcome::from_result(&result, request.files.len());
                info!(
                    successful = outcome.successful,
                    loading_failures = outcome.loading_failures,
                    processing_failures = outcome.processing_failures,
                    "Batch processed"
                );
                self.last_message = Some(outcome.message());
                self.dispatch(BatchEvent::ProcessSucceeded(result))?;
                Ok(outcome)
            }
            Err(e) => {
                self.fail(e.user_message());
                self.dispatch(BatchEvent::ProcessFailed {
                    error: e.user_message(),
                    retain: true,
                })?;
                Err(e.into())
            }
        }
    }

    /// Go back to `Ready` with the same files and configuration.
    pub fn rerun(&mut self) -> ControllerResult<&BatchState> {
        self.dispatch(BatchEvent::Rerun)?;
        self.last_error = None;
        self.last_message = None;
        Ok(&self.state)
    }

    /// Forget the batch and ask the service to drop its uploads.
    ///
    /// The local reset always happens; a failed cleanup request is only
    /// logged.
    pub async fn reset(&mut self) {
        if let Err(e) = self.dispatch(BatchEvent::Reset) {
            warn!(error = %e, "Unexpected reset failure");
        }
        self.discard_batch();
        self.enable_cosinorage = false;
        self.preprocess_args = self.default_preprocess_args.clone();
        self.feature_args = self.default_feature_args.clone();
        self.last_error = None;
        self.last_message = None;

        if let Err(e) = self.service.clear_all_state().await {
            warn!(error = %e, "Failed to clear server state");
        }
    }
}

#[cfg(all(test, feature = "local-service"))]
#[path = "batch_controller_tests.rs"]
mod tests;
