//! Batch lifecycle state machine.
//!
//! ```text
//! Empty → Uploading → Uploaded → Validating → Configuring → Ready → Processing → Completed
//!                  ↘ Empty                 ↘ Rejected                          ↘ Failed
//! ```
//!
//! [`reduce`] is the only place transitions happen. It is pure: the controller
//! performs the remote calls and feeds their outcomes back in as events.

use serde::Serialize;
use std::fmt;

use crate::api::{BatchResult, FilePreview, UploadedFile};
use crate::models::BatchConfig;

/// Files of a batch that passed schema validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedBatch {
    pub files: Vec<UploadedFile>,
    /// Column names of the first file; empty when they could not be fetched.
    pub columns: Vec<String>,
    pub preview: Option<FilePreview>,
}

/// A loaded batch with a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfiguredBatch {
    pub batch: LoadedBatch,
    pub config: BatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchState {
    Empty,
    Uploading { file_count: usize },
    Uploaded { files: Vec<UploadedFile> },
    Validating { files: Vec<UploadedFile> },
    Rejected { reason: String },
    Configuring(LoadedBatch),
    Ready(ConfiguredBatch),
    Processing(ConfiguredBatch),
    Completed {
        batch: ConfiguredBatch,
        result: BatchResult,
    },
    /// `retained` is `None` when the batch was discarded, e.g. after a failed
    /// re-validation; a new upload is then required.
    Failed {
        error: String,
        retained: Option<ConfiguredBatch>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    UploadStarted { file_count: usize },
    UploadSucceeded(Vec<UploadedFile>),
    UploadFailed(String),
    ValidationStarted,
    SchemaAccepted {
        columns: Vec<String>,
        preview: Option<FilePreview>,
    },
    SchemaRejected(String),
    Configured(BatchConfig),
    /// The draft of a ready batch was edited into an incomplete one.
    ConfigInvalidated,
    SubmitStarted,
    ProcessSucceeded(BatchResult),
    ProcessFailed { error: String, retain: bool },
    Rerun,
    Reset,
}

impl BatchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BatchEvent::UploadStarted { .. } => "upload_started",
            BatchEvent::UploadSucceeded(_) => "upload_succeeded",
            BatchEvent::UploadFailed(_) => "upload_failed",
            BatchEvent::ValidationStarted => "validation_started",
            BatchEvent::SchemaAccepted { .. } => "schema_accepted",
            BatchEvent::SchemaRejected(_) => "schema_rejected",
            BatchEvent::Configured(_) => "configured",
            BatchEvent::ConfigInvalidated => "config_invalidated",
            BatchEvent::SubmitStarted => "submit_started",
            BatchEvent::ProcessSucceeded(_) => "process_succeeded",
            BatchEvent::ProcessFailed { .. } => "process_failed",
            BatchEvent::Rerun => "rerun",
            BatchEvent::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Cannot apply '{event}' while the batch is {state}")]
    NotAllowed {
        state: &'static str,
        event: &'static str,
    },

    #[error("No files selected for upload")]
    NoFiles,
}

impl BatchState {
    pub fn name(&self) -> &'static str {
        match self {
            BatchState::Empty => "empty",
            BatchState::Uploading { .. } => "uploading",
            BatchState::Uploaded { .. } => "uploaded",
            BatchState::Validating { .. } => "validating",
            BatchState::Rejected { .. } => "rejected",
            BatchState::Configuring(_) => "configuring",
            BatchState::Ready(_) => "ready",
            BatchState::Processing(_) => "processing",
            BatchState::Completed { .. } => "completed",
            BatchState::Failed { .. } => "failed",
        }
    }

    /// Uploaded files the batch currently holds.
    pub fn files(&self) -> &[UploadedFile] {
        match self {
            BatchState::Uploaded { files } | BatchState::Validating { files } => files,
            BatchState::Configuring(batch) => &batch.files,
            BatchState::Ready(configured) | BatchState::Processing(configured) => {
                &configured.batch.files
            }
            BatchState::Completed { batch, .. } => &batch.batch.files,
            BatchState::Failed {
                retained: Some(batch),
                ..
            } => &batch.batch.files,
            _ => &[],
        }
    }

    pub fn loaded(&self) -> Option<&LoadedBatch> {
        match self {
            BatchState::Configuring(batch) => Some(batch),
            _ => self.configured().map(|configured| &configured.batch),
        }
    }

    pub fn configured(&self) -> Option<&ConfiguredBatch> {
        match self {
            BatchState::Ready(configured) | BatchState::Processing(configured) => Some(configured),
            BatchState::Completed { batch, .. } => Some(batch),
            BatchState::Failed { retained, .. } => retained.as_ref(),
            _ => None,
        }
    }

    pub fn config(&self) -> Option<&BatchConfig> {
        self.configured().map(|configured| &configured.config)
    }

    pub fn columns(&self) -> &[String] {
        self.loaded().map(|batch| batch.columns.as_slice()).unwrap_or(&[])
    }

    pub fn result(&self) -> Option<&BatchResult> {
        match self {
            BatchState::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Whether a new upload may start from here.
    pub fn accepts_upload(&self) -> bool {
        matches!(
            self,
            BatchState::Empty
                | BatchState::Rejected { .. }
                | BatchState::Failed { retained: None, .. }
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Apply one event to a state.
pub fn reduce(state: &BatchState, event: BatchEvent) -> Result<BatchState, TransitionError> {
    use BatchEvent as E;
    use BatchState as S;

    let not_allowed = |event: &BatchEvent| TransitionError::NotAllowed {
        state: state.name(),
        event: event.name(),
    };

    match (state, event) {
        (_, E::Reset) => Ok(S::Empty),

        (s, E::UploadStarted { file_count }) if s.accepts_upload() => {
            if file_count == 0 {
                Err(TransitionError::NoFiles)
            } else {
                Ok(S::Uploading { file_count })
            }
        }
        (S::Uploading { .. }, E::UploadSucceeded(files)) => {
            if files.is_empty() {
                Ok(S::Rejected {
                    reason: "The service accepted no files".to_string(),
                })
            } else {
                Ok(S::Uploaded { files })
            }
        }
        (S::Uploading { .. }, E::UploadFailed(_)) => Ok(S::Empty),

        (S::Uploaded { files }, E::ValidationStarted) if files.len() >= 2 => Ok(S::Validating {
            files: files.clone(),
        }),
        // a single file needs no cross-file validation
        (S::Uploaded { files }, E::SchemaAccepted { columns, preview }) if files.len() == 1 => {
            Ok(S::Configuring(LoadedBatch {
                files: files.clone(),
                columns,
                preview,
            }))
        }
        (S::Validating { files }, E::SchemaAccepted { columns, preview }) => {
            Ok(S::Configuring(LoadedBatch {
                files: files.clone(),
                columns,
                preview,
            }))
        }
        (S::Uploaded { .. } | S::Validating { .. }, E::SchemaRejected(reason)) => {
            Ok(S::Rejected { reason })
        }

        (S::Configuring(batch), E::Configured(config)) => Ok(S::Ready(ConfiguredBatch {
            batch: batch.clone(),
            config,
        })),
        (S::Ready(configured), E::Configured(config)) => Ok(S::Ready(ConfiguredBatch {
            batch: configured.batch.clone(),
            config,
        })),

        (S::Ready(configured), E::ConfigInvalidated) => {
            Ok(S::Configuring(configured.batch.clone()))
        }

        (S::Ready(configured), E::SubmitStarted) => Ok(S::Processing(configured.clone())),
        (S::Processing(configured), E::ProcessSucceeded(result)) => Ok(S::Completed {
            batch: configured.clone(),
            result,
        }),
        (S::Processing(configured), E::ProcessFailed { error, retain }) => Ok(S::Failed {
            error,
            retained: retain.then(|| configured.clone()),
        }),

        (S::Completed { batch, .. }, E::Rerun) => Ok(S::Ready(batch.clone())),
        (
            S::Failed {
                retained: Some(batch),
                ..
            },
            E::Rerun,
        ) => Ok(S::Ready(batch.clone())),

        (_, event) => Err(not_allowed(&event)),
    }
}
