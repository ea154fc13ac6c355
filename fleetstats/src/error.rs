//! Application-wide error types.

use std::path::{Path, PathBuf};

use thiserror::Error;
use upstream_api::UpstreamError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseSqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {op} {}: {source}", path.display())]
    IoPath {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No upstream servers configured")]
    NoServers,

    #[error("Upstream error: {0}")]
    Upstream(UpstreamError),

    #[error("Upstream authentication failed for server {server}")]
    UpstreamAuth { server: String },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<UpstreamError> for Error {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unauthorized => Self::UpstreamAuth {
                server: "unknown".to_string(),
            },
            other => Self::Upstream(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_unauthorized_maps_to_auth_error() {
        let err: Error = UpstreamError::Unauthorized.into();
        assert!(matches!(err, Error::UpstreamAuth { .. }));

        let err: Error = UpstreamError::Timeout.into();
        assert!(matches!(err, Error::Upstream(UpstreamError::Timeout)));
    }

    #[test]
    fn io_path_mentions_operation_and_path() {
        let err = Error::io_path(
            "creating directory",
            Path::new("/nope"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        let text = err.to_string();
        assert!(text.contains("creating directory"));
        assert!(text.contains("/nope"));
    }
}
