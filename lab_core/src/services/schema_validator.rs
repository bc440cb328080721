//! Cross-file column consistency check.

use tracing::{debug, warn};

use crate::api::SchemaVerdict;
use crate::remote::AnalysisService;

/// Prefix of the verdict message when the service could not be asked.
pub const VALIDATION_FAILURE_PREFIX: &str = "Column validation failed: ";

/// Ask the service whether every listed file shares one column schema.
///
/// Fewer than two files are trivially consistent and the service is not
/// contacted. A transport or server error yields `valid = false`; callers
/// treat it exactly like a mismatch.
pub async fn validate(service: &dyn AnalysisService, file_ids: &[String]) -> SchemaVerdict {
    if file_ids.len() < 2 {
        return SchemaVerdict::valid(format!(
            "{} file(s) uploaded, no cross-file validation needed",
            file_ids.len()
        ));
    }

    debug!(files = file_ids.len(), "Validating column schemas");
    match service.validate_bulk_columns(file_ids).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(error = %e, "Column validation request failed");
            SchemaVerdict::invalid(format!("{}{}", VALIDATION_FAILURE_PREFIX, e.user_message()))
        }
    }
}

#[cfg(all(test, feature = "local-service"))]
mod tests {
    use super::*;
    use crate::remote::{no_progress, LocalAnalysisService, UploadSource};

    #[tokio::test]
    async fn test_single_file_skips_service() {
        let service = LocalAnalysisService::new();
        let verdict = validate(&service, &["only".to_string()]).await;
        assert!(verdict.valid);
        assert!(service.calls().is_empty());

        let verdict = validate(&service, &[]).await;
        assert!(verdict.valid);
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_verdict_returned_verbatim() {
        let service = LocalAnalysisService::new();
        service.set_schema_verdict(SchemaVerdict::invalid("File b.csv has extra column 'w'"));
        let ids = vec!["a".to_string(), "b".to_string()];
        let verdict = validate(&service, &ids).await;
        assert_eq!(verdict, SchemaVerdict::invalid("File b.csv has extra column 'w'"));
        assert_eq!(service.call_count("validate_bulk_columns"), 1);
    }

    #[tokio::test]
    async fn test_service_error_becomes_invalid() {
        let service = LocalAnalysisService::new();
        let files = service
            .bulk_upload(
                vec![
                    UploadSource::new("a.csv", "t,x\n"),
                    UploadSource::new("b.csv", "t,x\n"),
                ],
                no_progress(),
            )
            .await
            .unwrap();
        let ids: Vec<String> = files.into_iter().map(|f| f.file_id).collect();

        service.fail_next("validate_bulk_columns", 503, "Service unavailable");
        let verdict = validate(&service, &ids).await;
        assert!(!verdict.valid);
        assert_eq!(verdict.message, "Column validation failed: Service unavailable");
    }
}
