//! Readiness check for the optional biological-age step.

use serde::Serialize;

use crate::api::UploadedFile;
use crate::models::CosinorAgeInput;

/// Outcome of the cosinorage readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateStatus {
    pub is_valid: bool,
    pub missing_count: usize,
    pub total_count: usize,
}

impl GateStatus {
    /// Message shown when submission is refused.
    pub fn describe(&self) -> String {
        format!(
            "CosinorAge prediction requires age and gender for every file: {} of {} files are missing a valid age or gender",
            self.missing_count, self.total_count
        )
    }
}

/// Check the inputs of every file.
///
/// When the step is disabled the gate always passes. Otherwise an input is
/// missing when its age does not parse to a number in (0, 120] or its gender
/// is unset; `Gender::Unknown` counts as set.
pub fn status(inputs: &[CosinorAgeInput], enabled: bool) -> GateStatus {
    let total_count = inputs.len();
    if !enabled {
        return GateStatus {
            is_valid: true,
            missing_count: 0,
            total_count,
        };
    }

    let missing_count = inputs.iter().filter(|input| !input.is_usable()).count();
    GateStatus {
        is_valid: missing_count == 0,
        missing_count,
        total_count,
    }
}

/// Like [`status`], but counted against the uploaded files, so a file with
/// no input at all is missing too.
pub fn status_for(files: &[UploadedFile], inputs: &[CosinorAgeInput], enabled: bool) -> GateStatus {
    let total_count = files.len();
    if !enabled {
        return GateStatus {
            is_valid: true,
            missing_count: 0,
            total_count,
        };
    }

    let missing_count = files
        .iter()
        .filter(|file| {
            !inputs
                .iter()
                .any(|input| input.file_id == file.file_id && input.is_usable())
        })
        .count();
    GateStatus {
        is_valid: missing_count == 0,
        missing_count,
        total_count,
    }
}
