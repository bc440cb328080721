#![allow(dead_code)]

use std::sync::{Mutex, PoisonError};

use cosinor_lab::api::BatchResult;
use cosinor_lab::remote::UploadSource;

/// Environment variables read by `LabConfig::apply_env_overrides`.
pub const LAB_VARS: [&str; 2] = ["COSINOR_API_URL", "COSINOR_TIMEOUT_SECS"];

static LAB_ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with every lab variable unset except the given overrides.
///
/// Tests touching the lab variables run one at a time; the previous values
/// come back when `f` returns or panics.
pub fn with_lab_env<R>(overrides: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let _lock = LAB_ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let _saved = SavedLabEnv::capture();

    for var in LAB_VARS {
        std::env::remove_var(var);
    }
    for (var, value) in overrides {
        assert!(LAB_VARS.contains(var), "{} is not a lab variable", var);
        std::env::set_var(var, value);
    }
    f()
}

struct SavedLabEnv(Vec<(&'static str, Option<String>)>);

impl SavedLabEnv {
    fn capture() -> Self {
        Self(
            LAB_VARS
                .iter()
                .map(|var| (*var, std::env::var(var).ok()))
                .collect(),
        )
    }
}

impl Drop for SavedLabEnv {
    fn drop(&mut self) {
        for (var, value) in &self.0 {
            match value {
                Some(value) => std::env::set_var(var, value),
                None => std::env::remove_var(var),
            }
        }
    }
}

pub const ACCEL_CSV: &str = "\
timestamp,accel_x,accel_y,accel_z
2024-03-01 00:00:00,0.012,-0.031,0.998
2024-03-01 00:00:01,0.015,-0.029,1.002
2024-03-01 00:00:02,0.011,-0.033,0.997
";

pub const ENMO_CSV: &str = "\
time,ENMO
2024-03-01 00:00:00,0.013
2024-03-01 00:01:00,0.021
";

pub fn accel_sources(names: &[&str]) -> Vec<UploadSource> {
    names
        .iter()
        .map(|name| UploadSource::new(*name, ACCEL_CSV))
        .collect()
}

/// A `bulk_process` response as the service sends it: two processed files,
/// one loading failure and one processing failure out of four.
pub fn batch_result_json() -> serde_json::Value {
    serde_json::json!({
        "individual_results": [
            {
                "filename": "subject_a.csv",
                "features": {
                    "sleep": { "TST": [420, 410, 430], "WASO": 35.5 },
                    "cosinor": { "MESOR": 0.03, "amplitude": 0.02, "acrophase": 3.1 },
                    "physical_activity": {
                        "sedentary": [600, 610],
                        "light": { "day1": 120, "day2": null }
                    }
                },
                "enmo_timeseries": [
                    { "timestamp": "2024-03-01 00:00:00", "enmo": 0.013 },
                    { "timestamp": "2024-03-01 00:01:00", "enmo": 0.021 }
                ]
            },
            {
                "filename": "subject_b.csv",
                "features": {
                    "sleep": { "TST": 400, "WASO": "n/a" },
                    "cosinor": { "MESOR": 0.04, "amplitude": 0.025, "acrophase": 2.9 }
                }
            }
        ],
        "failed_files": [
            { "file_id": "f-3", "filename": "subject_c.csv", "error": "Could not parse timestamps" }
        ],
        "failed_handlers": [[3, "Feature extraction failed"]],
        "summary_dataframe": [
            { "feature": "sleep_TST", "count": 4, "mean": 415.0, "std": 12.9, "min": 400, "max": 430, "median": 415.0 },
            { "feature": "cosinor_MESOR", "count": 2, "mean": 0.035 },
            { "feature": "Amplitude", "count": 2, "mean": 0.0225 },
            { "feature": "nonexistent", "count": 0 }
        ],
        "correlation_matrix": {
            "TST": { "TST": 1.0, "MESOR": -0.3, "amplitude": null },
            "MESOR": { "TST": -0.3, "MESOR": 1.0, "amplitude": 0.9 },
            "amplitude": { "TST": null, "MESOR": 0.9, "amplitude": 1.0 }
        },
        "total_files": 4
    })
}

pub fn batch_result() -> BatchResult {
    serde_json::from_value(batch_result_json()).expect("fixture is a valid batch result")
}
