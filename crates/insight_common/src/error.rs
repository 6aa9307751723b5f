//! Error types for the insight pipeline.

use std::time::Duration;
use thiserror::Error;

/// Failures of a single reasoning request.
///
/// None of these ever escape the controller: every variant is logged and
/// the request settles back to idle with the published insight untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightError {
    #[error("Reasoning backend is disabled in configuration")]
    Disabled,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl InsightError {
    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            InsightError::Disabled => "disabled",
            InsightError::Transport(_) => "transport",
            InsightError::MalformedResponse(_) => "malformed_response",
            InsightError::Timeout(_) => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InsightError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
        assert_eq!(
            InsightError::Timeout(Duration::from_secs(30)).to_string(),
            "Request timed out after 30s"
        );
        assert_eq!(
            InsightError::Timeout(Duration::from_millis(500)).to_string(),
            "Request timed out after 500ms"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(InsightError::Disabled.kind(), "disabled");
        assert_eq!(InsightError::MalformedResponse(String::new()).kind(), "malformed_response");
    }
}
