//! Error types for the conformance harness
//!
//! Transport failures and fixture problems are errors; a well-formed
//! rejection from the service is not. Rejections travel as data in
//! [`HttpResult`](super::client::HttpResult) and are judged by the
//! validator, so only conditions that prevent a case from being driven
//! to a verdict appear here.

use std::io;
use std::path::Path;

/// Main error type for harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Network-layer failure reaching the service (timeout, refused, DNS)
    #[error("Transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    /// A case source row does not have the expected column count
    #[error("Malformed row in {path} at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        path: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A case source could not be parsed for a reason other than column count
    #[error("Case source error in {path}: {message}")]
    CaseParse { path: String, message: String },

    /// A document could not be rendered from the given case
    #[error("Render error for case '{case}': {message}")]
    Render { case: String, message: String },

    /// Harness configuration is missing or inconsistent
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File operation failure
    #[error("IO error for '{path}': {message}")]
    Io { path: String, message: String },
}

impl HarnessError {
    /// Transport error from a reqwest failure
    pub fn transport(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        HarnessError::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// IO error carrying the offending path
    pub fn io(path: &Path, err: io::Error) -> Self {
        HarnessError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Configuration error from a message
    pub fn config(message: impl Into<String>) -> Self {
        HarnessError::Config {
            message: message.into(),
        }
    }

    /// Render error for a named case
    pub fn render(case: impl Into<String>, message: impl Into<String>) -> Self {
        HarnessError::Render {
            case: case.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = HarnessError::MalformedRow {
            path: "/tmp/cases.csv".to_string(),
            line: 7,
            expected: 16,
            found: 12,
        };
        let text = err.to_string();
        assert!(text.contains("/tmp/cases.csv"), "missing path: {}", text);
        assert!(text.contains("line 7"), "missing line: {}", text);
        assert!(text.contains("16"), "missing expected count: {}", text);
        assert!(text.contains("12"), "missing found count: {}", text);
    }

    #[test]
    fn test_transport_helper() {
        let err = HarnessError::transport("http://127.0.0.1:8080/createExperiment", "timed out");
        assert!(matches!(err, HarnessError::Transport { .. }));
        assert!(err.to_string().contains("timed out"));
    }
}
