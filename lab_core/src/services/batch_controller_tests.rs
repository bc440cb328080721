use super::*;
use crate::api::{FailedHandler, PerFileResult, SchemaVerdict};
use crate::models::{DataUnit, TimestampFormat};
use crate::remote::{no_progress, LocalAnalysisService};
use parking_lot::Mutex;

const ACCEL: &str = "timestamp,x,y,z\n2024-01-01 00:00:00,0.1,0.2,0.9\n2024-01-01 00:00:01,0.1,0.1,1.0\n";

fn sources(n: usize) -> Vec<UploadSource> {
    (0..n)
        .map(|i| UploadSource::new(format!("subject{}.csv", i), ACCEL))
        .collect()
}

fn controller() -> (LocalAnalysisService, BatchController) {
    let service = LocalAnalysisService::new();
    let controller = BatchController::new(Arc::new(service.clone()));
    (service, controller)
}

fn accel_draft() -> ConfigDraft {
    ConfigDraft {
        data_type: Some(DataType::Accelerometer),
        data_unit: Some(DataUnit::G),
        timestamp_format: Some(TimestampFormat::Datetime),
        time_column: Some("timestamp".into()),
        x_column: Some("x".into()),
        y_column: Some("y".into()),
        z_column: Some("z".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_file_goes_straight_to_configuring() {
    let (service, mut controller) = controller();
    let state = controller.upload(sources(1), no_progress()).await.unwrap();
    assert_eq!(state.name(), "configuring");
    assert_eq!(service.call_count("validate_bulk_columns"), 0);
    assert_eq!(controller.columns(), &["timestamp", "x", "y", "z"]);
    assert_eq!(controller.cosinor_inputs().len(), 1);
    assert_eq!(controller.cosinor_inputs()[0].age, "50");
}

#[tokio::test]
async fn test_upload_reports_progress() {
    let (_service, mut controller) = controller();
    let seen = Arc::new(Mutex::new(Vec::<f64>::new()));
    let sink = Arc::clone(&seen);
    controller
        .upload(sources(2), Arc::new(move |p: f64| sink.lock().push(p)))
        .await
        .unwrap();
    let seen = seen.lock();
    assert_eq!(seen.last().copied(), Some(100.0));
    assert!(seen.iter().all(|p| (0.0..=100.0).contains(p)));
}

#[tokio::test]
async fn test_mismatched_schema_discards_batch() {
    let (service, mut controller) = controller();
    service.set_schema_verdict(SchemaVerdict::invalid("subject2.csv has different columns"));

    let err = controller.upload(sources(3), no_progress()).await.unwrap_err();
    assert!(matches!(err, ControllerError::SchemaRejected(_)));
    assert_eq!(controller.state().name(), "rejected");
    assert!(controller.files().is_empty());
    assert!(controller.columns().is_empty());
    assert!(controller.cosinor_inputs().is_empty());
    assert_eq!(controller.draft(), &ConfigDraft::default());
    assert_eq!(controller.last_error(), Some("subject2.csv has different columns"));
    // the column listing is never fetched for a rejected batch
    assert_eq!(service.call_count("get_columns"), 0);
}

#[tokio::test]
async fn test_validation_failure_is_a_rejection() {
    let (service, mut controller) = controller();
    service.fail_next("validate_bulk_columns", 500, "database locked");
    let err = controller.upload(sources(2), no_progress()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Column validation failed: database locked"
    );
    assert_eq!(controller.state().name(), "rejected");
}

#[tokio::test]
async fn test_upload_transport_error_returns_to_empty() {
    let (service, mut controller) = controller();
    service.fail_next("bulk_upload", 502, "Bad gateway");
    let err = controller.upload(sources(2), no_progress()).await.unwrap_err();
    assert!(matches!(err, ControllerError::Service(_)));
    assert_eq!(controller.state(), &BatchState::Empty);
    assert_eq!(controller.last_error(), Some("Bad gateway"));
}

#[tokio::test]
async fn test_column_listing_failure_does_not_block() {
    let (service, mut controller) = controller();
    service.fail_next("get_columns", 500, "boom");
    let state = controller.upload(sources(1), no_progress()).await.unwrap();
    assert_eq!(state.name(), "configuring");
    assert!(controller.columns().is_empty());
    assert_eq!(controller.last_error(), Some("Failed to load columns: boom"));
}

#[tokio::test]
async fn test_incomplete_config_stays_configuring() {
    let (_service, mut controller) = controller();
    controller.upload(sources(1), no_progress()).await.unwrap();

    let mut draft = accel_draft();
    draft.data_unit = None;
    let err = controller.configure(draft).unwrap_err();
    assert!(matches!(
        err,
        ControllerError::IncompleteConfig(ConfigError::MissingField("data_unit"))
    ));
    assert_eq!(controller.state().name(), "configuring");

    let mut draft = accel_draft();
    draft.z_column = Some("w".into());
    assert!(matches!(
        controller.configure(draft),
        Err(ControllerError::IncompleteConfig(ConfigError::UnknownColumn(_)))
    ));

    controller.configure(accel_draft()).unwrap();
    assert_eq!(controller.state().name(), "ready");

    let mut draft = accel_draft();
    draft.y_column = Some("x".into());
    assert!(controller.configure(draft).is_err());
    assert_eq!(controller.state().name(), "configuring");
}

#[tokio::test]
async fn test_default_columns_for_data_type() {
    let (_service, mut controller) = controller();
    controller.upload(sources(1), no_progress()).await.unwrap();
    let mut draft = controller.apply_default_columns(DataType::Accelerometer).unwrap();
    assert_eq!(draft.time_column.as_deref(), Some("timestamp"));
    assert_eq!(draft.x_column.as_deref(), Some("x"));
    draft.data_unit = Some(DataUnit::MilliG);
    draft.timestamp_format = Some(TimestampFormat::Datetime);
    let config = controller.configure(draft).unwrap();
    assert_eq!(config.data_columns(), vec!["x", "y", "z"]);
}

#[tokio::test]
async fn test_configure_requires_loaded_batch() {
    let (_service, mut controller) = controller();
    assert!(matches!(
        controller.configure(accel_draft()),
        Err(ControllerError::Transition(_))
    ));
}

#[tokio::test]
async fn test_submit_builds_request() {
    let (service, mut controller) = controller();
    controller.upload(sources(2), no_progress()).await.unwrap();
    controller.configure(accel_draft()).unwrap();
    let ids: Vec<String> = controller.files().iter().map(|f| f.file_id.clone()).collect();

    controller.enable_cosinorage(true);
    controller.set_age(&ids[0], "67.5").unwrap();
    controller.set_gender(&ids[1], Some(Gender::Female)).unwrap();

    let outcome = controller.submit().await.unwrap();
    assert_eq!(outcome.message(), "Successfully processed all 2 files!");
    assert_eq!(controller.state().name(), "completed");

    let request = service.last_process_request().unwrap();
    assert_eq!(request.files.len(), 2);
    assert_eq!(request.files[0].data_columns, vec!["x", "y", "z"]);
    assert_eq!(request.files[0].data_unit, Some(DataUnit::G));
    assert!(request.enable_cosinorage);
    assert_eq!(request.cosinor_age_inputs.len(), 2);
    assert_eq!(request.cosinor_age_inputs[0].age, 67.5);
    assert_eq!(request.cosinor_age_inputs[1].gender, Gender::Female);
    // upload validation plus the pre-submit check
    assert_eq!(service.call_count("validate_bulk_columns"), 2);
}

#[tokio::test]
async fn test_cosinor_inputs_omitted_when_disabled() {
    let (service, mut controller) = controller();
    controller.upload(sources(1), no_progress()).await.unwrap();
    controller.configure(accel_draft()).unwrap();
    controller.submit().await.unwrap();
    let request = service.last_process_request().unwrap();
    assert!(!request.enable_cosinorage);
    assert!(request.cosinor_age_inputs.is_empty());
}

#[tokio::test]
async fn test_gate_blocks_submission_without_network() {
    let (service, mut controller) = controller();
    controller.upload(sources(2), no_progress()).await.unwrap();
    controller.configure(accel_draft()).unwrap();
    let id = controller.files()[1].file_id.clone();
    controller.enable_cosinorage(true);
    controller.set_age(&id, "").unwrap();

    let calls_before = service.calls().len();
    let err = controller.submit().await.unwrap_err();
    match err {
        ControllerError::CosinorageGate(gate) => {
            assert_eq!(gate.missing_count, 1);
            assert_eq!(gate.total_count, 2);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(service.calls().len(), calls_before);
    assert_eq!(controller.state().name(), "ready");
}

#[tokio::test]
async fn test_unknown_file_input() {
    let (_service, mut controller) = controller();
    controller.upload(sources(1), no_progress()).await.unwrap();
    assert!(matches!(
        controller.set_age("nope", "40"),
        Err(ControllerError::UnknownFile(_))
    ));
}

#[tokio::test]
async fn test_revalidation_failure_discards_batch() {
    let (service, mut controller) = controller();
    controller.upload(sources(2), no_progress()).await.unwrap();
    controller.configure(accel_draft()).unwrap();

    service.set_schema_verdict(SchemaVerdict::invalid("subject1.csv changed"));
    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, ControllerError::SchemaRejected(_)));
    assert_eq!(
        controller.state(),
        &BatchState::Failed {
            error: "subject1.csv changed".into(),
            retained: None
        }
    );
    assert_eq!(service.call_count("bulk_process"), 0);
    assert!(controller.rerun().is_err());
}

#[tokio::test]
async fn test_transport_error_retains_batch_for_rerun() {
    let (service, mut controller) = controller();
    controller.upload(sources(2), no_progress()).await.unwrap();
    controller.configure(accel_draft()).unwrap();

    service.fail_next("bulk_process", 504, "Gateway timeout");
    let err = controller.submit().await.unwrap_err();
    assert!(matches!(err, ControllerError::Service(_)));
    assert_eq!(controller.state().name(), "failed");
    assert_eq!(controller.files().len(), 2);
    assert!(controller.config().is_some());

    assert_eq!(controller.rerun().unwrap().name(), "ready");
    controller.submit().await.unwrap();
    assert_eq!(controller.state().name(), "completed");
}

#[tokio::test]
async fn test_partial_failure_is_completed() {
    let (service, mut controller) = controller();
    service.set_process_result(BatchResult {
        individual_results: vec![PerFileResult {
            filename: "subject0.csv".into(),
            ..Default::default()
        }],
        failed_handlers: vec![FailedHandler {
            index: 1,
            error: "No valid days".into(),
        }],
        total_files: Some(2),
        ..Default::default()
    });
    controller.upload(sources(2), no_progress()).await.unwrap();
    controller.configure(accel_draft()).unwrap();

    let outcome = controller.submit().await.unwrap();
    assert_eq!(controller.state().name(), "completed");
    assert_eq!(
        controller.last_message(),
        Some("Successfully processed 1 out of 2 files. 1 files failed during processing.")
    );
    assert_eq!(controller.outcome(), Some(outcome));
}

#[tokio::test]
async fn test_submit_requires_ready() {
    let (service, mut controller) = controller();
    controller.upload(sources(1), no_progress()).await.unwrap();
    assert!(matches!(
        controller.submit().await,
        Err(ControllerError::Transition(TransitionError::NotAllowed {
            state: "configuring",
            ..
        }))
    ));
    assert_eq!(service.call_count("bulk_process"), 0);
}

#[tokio::test]
async fn test_reset_is_best_effort() {
    let (service, mut controller) = controller();
    controller.upload(sources(2), no_progress()).await.unwrap();
    controller.enable_cosinorage(true);
    controller.set_preprocess_args(PreprocessArgs {
        filter_cutoff: 5.0,
        ..Default::default()
    });

    service.fail_next("clear_all_state", 500, "cleanup failed");
    controller.reset().await;

    assert_eq!(controller.state(), &BatchState::Empty);
    assert!(controller.cosinor_inputs().is_empty());
    assert!(!controller.cosinorage_enabled());
    assert_eq!(controller.preprocess_args(), &PreprocessArgs::default());
    assert_eq!(controller.last_error(), None);
    assert_eq!(service.call_count("clear_all_state"), 1);

    // a new batch can start right away
    controller.upload(sources(1), no_progress()).await.unwrap();
    assert_eq!(controller.state().name(), "configuring");
}

#[tokio::test]
async fn test_from_config_defaults() {
    let service = LocalAnalysisService::new();
    let mut config = LabConfig::default();
    config.batch.enable_cosinorage = true;
    config.features.pa_cutpoint_mv = 100.0;
    let mut controller = BatchController::from_config(Arc::new(service), &config);
    assert!(controller.cosinorage_enabled());
    assert_eq!(controller.feature_args().pa_cutpoint_mv, 100.0);

    controller.set_feature_args(FeatureArgs::default());
    controller.reset().await;
    assert_eq!(controller.feature_args().pa_cutpoint_mv, 100.0);
}
