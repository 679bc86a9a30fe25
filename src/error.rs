//! Domain-specific error types for math-annotate

use thiserror::Error;

/// Main error type for the annotation pipeline
#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Collaborator error: {message}")]
    Collaborator { message: String },

    #[error("Invalid collaborator response: {message}")]
    InvalidResponse { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },

    #[error(
        "Failed to persist record #{index} (post_id {post_id}): {message}; {persisted} record(s) were written before the failure"
    )]
    SinkWrite {
        index: usize,
        post_id: i64,
        persisted: usize,
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AnnotatorError {
    /// True for failures the orchestrator recovers from with a per-record fallback.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            AnnotatorError::Collaborator { .. }
                | AnnotatorError::InvalidResponse { .. }
                | AnnotatorError::Timeout { .. }
        )
    }
}

impl From<anyhow::Error> for AnnotatorError {
    fn from(err: anyhow::Error) -> Self {
        AnnotatorError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AnnotatorError {
    fn from(err: std::io::Error) -> Self {
        AnnotatorError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AnnotatorError {
    fn from(err: serde_json::Error) -> Self {
        AnnotatorError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<crate::clients::AgentError> for AnnotatorError {
    fn from(err: crate::clients::AgentError) -> Self {
        match err {
            crate::clients::AgentError::Timeout { timeout_ms } => AnnotatorError::Timeout {
                operation: "model backend call".to_string(),
                timeout_ms,
            },
            other => AnnotatorError::Collaborator {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for annotation operations
pub type Result<T> = std::result::Result<T, AnnotatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_collaborator_failures() {
        let timeout = AnnotatorError::Timeout {
            operation: "term extraction".into(),
            timeout_ms: 10,
        };
        assert!(timeout.is_collaborator_failure());

        let sink = AnnotatorError::SinkWrite {
            index: 3,
            post_id: 42,
            persisted: 3,
            message: "disk full".into(),
        };
        assert!(!sink.is_collaborator_failure());
        assert!(sink.to_string().contains("3 record(s) were written"));
    }

    #[test]
    fn agent_timeout_maps_to_timeout() {
        let err: AnnotatorError = crate::clients::AgentError::Timeout { timeout_ms: 500 }.into();
        assert!(matches!(err, AnnotatorError::Timeout { timeout_ms: 500, .. }));
    }

    #[test]
    fn backend_http_failures_become_collaborator_errors() {
        let err: AnnotatorError = crate::clients::AgentError::HttpStatus {
            status: 503,
            body: "overloaded".into(),
        }
        .into();
        assert!(matches!(err, AnnotatorError::Collaborator { .. }));
        assert!(err.is_collaborator_failure());
        assert!(err.to_string().contains("503"));
    }
}
