//! Error types for analysis-service operations.
//!
//! Every remote call fails fast: there is no retry policy, so errors carry
//! enough context to be shown verbatim to the user.

use std::fmt;

/// Result type for analysis-service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Structured context for service errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "bulk_upload", "bulk_process")
    pub operation: Option<String>,
    /// The endpoint path involved
    pub endpoint: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the endpoint path.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.operation.is_none() && self.endpoint.is_none() && self.details.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref endpoint) = self.endpoint {
            parts.push(format!("endpoint={}", endpoint));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, " [{}]", parts.join(", "))
    }
}

/// Error type for analysis-service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced a response (DNS, connect, timeout, body I/O).
    #[error("Transport error: {message}{context}")]
    Transport {
        message: String,
        context: ErrorContext,
    },

    /// The service answered with a non-success status.
    /// `message` is the service's `detail` text when it sent one.
    #[error("{message}{context}")]
    Status {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    /// The response body did not match the expected shape.
    #[error("Invalid response: {message}{context}")]
    Decode {
        message: String,
        context: ErrorContext,
    },

    /// A local file selected for upload could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration or initialization error.
    #[error("Configuration error: {message}{context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

impl ServiceError {
    /// Create a transport error with context.
    pub fn transport(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Transport {
            message: message.into(),
            context,
        }
    }

    /// Create a status error with context.
    pub fn status(status: u16, message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Status {
            status,
            message: message.into(),
            context,
        }
    }

    /// Create a decode error with context.
    pub fn decode(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Decode {
            message: message.into(),
            context,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Message suitable for direct display, without the debug context.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { message, .. } => message.clone(),
            Self::Status { message, .. } => message.clone(),
            Self::Decode { message, .. } => format!("Invalid response: {}", message),
            Self::Io { path, source } => format!("Failed to read '{}': {}", path, source),
            Self::Configuration { message, .. } => message.clone(),
        }
    }

    /// Get the error context, when the variant has one.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Transport { context, .. }
            | Self::Status { context, .. }
            | Self::Decode { context, .. }
            | Self::Configuration { context, .. } => Some(context),
            Self::Io { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let ctx = ErrorContext::new("bulk_process")
            .with_endpoint("/api/bulk_process")
            .with_details("status 500");
        assert_eq!(
            ctx.to_string(),
            " [operation=bulk_process, endpoint=/api/bulk_process, details=status 500]"
        );
        assert_eq!(ErrorContext::default().to_string(), "");
    }

    #[test]
    fn test_status_error_shows_detail() {
        let err = ServiceError::status(
            422,
            "Files have different columns",
            ErrorContext::new("validate_bulk_columns"),
        );
        assert_eq!(err.user_message(), "Files have different columns");
        assert!(err.to_string().starts_with("Files have different columns"));
        assert_eq!(
            err.context().and_then(|c| c.operation.as_deref()),
            Some("validate_bulk_columns")
        );
    }
}
