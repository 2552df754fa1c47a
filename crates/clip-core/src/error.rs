use std::path::PathBuf;
use thiserror::Error;

use crate::models::EntityKind;

/// All errors produced by the clip progress report pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A remote call was attempted without both session tokens.
    #[error("Authentication required: bearer and member tokens must both be present")]
    AuthRequired,

    /// The authentication exchange was rejected or returned a malformed body.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The remote record source could not deliver the requested rows.
    #[error("Record source fetch failed: {0}")]
    Source(String),

    /// A single metadata lookup failed. Absorbed by the resolver.
    #[error("Metadata lookup for {kind} failed: {message}")]
    Lookup { kind: EntityKind, message: String },

    /// The HTTP layer failed before a response was received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Caller-supplied input (credentials, query) is incomplete or inconsistent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Delimited text could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// An input file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A report file could not be written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReportError {
    /// `false` only for failures the pipeline degrades around instead of
    /// aborting the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ReportError::Lookup { .. })
    }
}

/// Convenience alias used throughout the clip crates.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_auth_required() {
        let msg = ReportError::AuthRequired.to_string();
        assert!(msg.starts_with("Authentication required"));
    }

    #[test]
    fn test_error_display_auth_failed() {
        let err = ReportError::AuthFailed("HTTP 401".to_string());
        assert_eq!(err.to_string(), "Authentication failed: HTTP 401");
    }

    #[test]
    fn test_error_display_source() {
        let err = ReportError::Source("HTTP 500 Internal Server Error".to_string());
        assert_eq!(
            err.to_string(),
            "Record source fetch failed: HTTP 500 Internal Server Error"
        );
    }

    #[test]
    fn test_error_display_lookup() {
        let err = ReportError::Lookup {
            kind: EntityKind::Course,
            message: "timed out".to_string(),
        };
        assert_eq!(err.to_string(), "Metadata lookup for course failed: timed out");
    }

    #[test]
    fn test_error_display_file_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ReportError::FileWrite {
            path: PathBuf::from("/reports/out.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to write file"));
        assert!(msg.contains("/reports/out.csv"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_only_lookup_is_non_fatal() {
        let lookup = ReportError::Lookup {
            kind: EntityKind::Member,
            message: "HTTP 404".to_string(),
        };
        assert!(!lookup.is_fatal());
        assert!(ReportError::AuthRequired.is_fatal());
        assert!(ReportError::AuthFailed(String::new()).is_fatal());
        assert!(ReportError::Source(String::new()).is_fatal());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ReportError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: ReportError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
