//! Success / failure accounting of a processed batch.

use serde::Serialize;

use crate::api::BatchResult;

/// Counts of a finished run and the message shown to the user.
///
/// Loading failures (`failed_files`) and processing failures
/// (`failed_handlers`) are kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub successful: usize,
    pub loading_failures: usize,
    pub processing_failures: usize,
    pub total: usize,
}

impl BatchOutcome {
    /// `uploaded` is the number of files submitted; the declared total of the
    /// result takes precedence, and the total never drops below the number
    /// of files accounted for.
    pub fn from_result(result: &BatchResult, uploaded: usize) -> Self {
        let successful = result.individual_results.len();
        let loading_failures = result.failed_files.len();
        let processing_failures = result.failed_handlers.len();
        let declared = result.total_files.unwrap_or(uploaded);
        Self {
            successful,
            loading_failures,
            processing_failures,
            total: declared.max(successful + loading_failures + processing_failures),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.loading_failures + self.processing_failures > 0
    }

    pub fn message(&self) -> String {
        let (s, t, h, p) = (
            self.successful,
            self.total,
            self.loading_failures,
            self.processing_failures,
        );
        match (h, p) {
            (0, 0) => format!("Successfully processed all {} files!", s),
            (h, 0) => format!(
                "Successfully processed {} out of {} files. {} files failed during loading.",
                s, t, h
            ),
            (0, p) => format!(
                "Successfully processed {} out of {} files. {} files failed during processing.",
                s, t, p
            ),
            (h, p) => format!(
                "Successfully processed {} out of {} files. {} files failed during loading, {} files failed during processing.",
                s, t, h, p
            ),
        }
    }
}
