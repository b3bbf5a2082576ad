use std::path::Path;

use thiserror::Error;

/// Errors raised while building or serializing a directory export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failure of a single sink operation.
///
/// Never propagated out of an export call; the dispatcher turns it into a
/// [`crate::sink::DeliveryOutcome`].
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Remote push to {url} failed: {message}")]
    Remote { url: String, message: String },

    #[error("Remote push to {url} rejected with status {status}: {body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Output file already exists: {path}")]
    AlreadyExists { path: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error at {path}: {message}")]
    Archive { path: String, message: String },

    #[error("Upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
}

impl DeliveryError {
    pub fn remote(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::AlreadyExists {
            return Self::AlreadyExists {
                path: path.display().to_string(),
            };
        }
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn archive(path: &Path, message: impl Into<String>) -> Self {
        Self::Archive {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub fn upload(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upload {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
