//! Pipeline error type.

use crate::db::repository::RepositoryError;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Failures that abort an upload.
///
/// Row-level problems (missing discriminant, blank mandatory fields,
/// duplicates) are never errors; they are tallied in the upload summary.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The upload itself is unusable. Raised before any store interaction.
    #[error("{message}{}", display_cause(.cause))]
    InputFault {
        message: String,
        cause: Option<String>,
    },

    /// A probe or the commit failed or timed out.
    #[error("Store fault: {0}")]
    Store(#[from] RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_cause(cause: &Option<String>) -> String {
    match cause {
        Some(cause) => format!(": {}", cause),
        None => String::new(),
    }
}

impl IngestError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputFault {
            message: message.into(),
            cause: None,
        }
    }

    pub fn input_with_cause(message: impl Into<String>, cause: impl ToString) -> Self {
        Self::InputFault {
            message: message.into(),
            cause: Some(cause.to_string()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_input_fault(&self) -> bool {
        matches!(self, Self::InputFault { .. })
    }

    pub fn is_store_fault(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::input_with_cause("Failed to buffer the uploaded file", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_fault_display_includes_cause() {
        let err = IngestError::input_with_cause("Unreadable workbook", "zip header missing");
        assert_eq!(err.to_string(), "Unreadable workbook: zip header missing");
        assert!(err.is_input_fault());
        assert_eq!(IngestError::input("The uploaded file is empty").to_string(), "The uploaded file is empty");
    }

    #[test]
    fn test_store_fault_from_repository_error() {
        let err: IngestError = RepositoryError::timeout("probe exceeded 30000ms").into();
        assert!(err.is_store_fault());
        assert!(err.to_string().starts_with("Store fault: Timeout error"));
    }
}
