use thiserror::Error;

/// Every way a pipeline invocation can end short of a successful submission.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("usage limit exceeded")]
    UsageLimit,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to fetch page: {message}")]
    Fetch { status: Option<u16>, message: String },

    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("no registration form detected")]
    NoFormDetected,

    #[error("{message}")]
    Submission { status: Option<u16>, message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("crypto error: {0}")]
    Crypto(String),
}

impl AutomationError {
    /// Failures that are written to a session and reported as a handled
    /// business outcome rather than an infrastructure fault.
    pub fn is_session_outcome(&self) -> bool {
        matches!(
            self,
            AutomationError::Fetch { .. }
                | AutomationError::Analysis(_)
                | AutomationError::NoFormDetected
                | AutomationError::Submission { .. }
                | AutomationError::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(AutomationError::NoFormDetected.is_session_outcome());
        assert!(AutomationError::Submission { status: Some(500), message: "HTTP 500".into() }
            .is_session_outcome());
        assert!(!AutomationError::UsageLimit.is_session_outcome());
        assert!(!AutomationError::Storage("down".into()).is_session_outcome());
    }

    #[test]
    fn test_fetch_message_is_verbatim() {
        let err = AutomationError::Fetch { status: Some(404), message: "HTTP 404".into() };
        assert_eq!(err.to_string(), "failed to fetch page: HTTP 404");
    }
}
