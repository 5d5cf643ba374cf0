// ABOUTME: Error types shared by the stores, feed client, and sync engine
// ABOUTME: Maps every failure kind to a stable exit code for the CLI

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No credential on record for account {0}")]
    CredentialNotFound(String),

    #[error("Transient feed error on {endpoint}: {message}")]
    FeedTransient { endpoint: String, message: String },

    #[error("Feed rejected credential on {endpoint}: {message}")]
    FeedAuth { endpoint: String, message: String },

    #[error("Upload conflict at {path}: {message}")]
    UploadConflict { path: String, message: String },

    #[error("Upload failed for {path}: {message}")]
    Upload { path: String, message: String },

    #[error("Failed to persist {store} snapshot: {source}")]
    StoreWrite {
        store: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status} on {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Transform error for {path}: {message}")]
    Transform { path: String, message: String },

    #[error("Webhook signature mismatch")]
    Signature,

    #[error("Invalid webhook payload: {0}")]
    Webhook(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::CredentialNotFound(_) => 3,
            Error::FeedAuth { .. } => 4,
            Error::FeedTransient { .. } | Error::Network(_) => 5,
            Error::Api { .. } => 6,
            Error::UploadConflict { .. } | Error::Upload { .. } => 7,
            Error::StoreWrite { .. } | Error::Filesystem(_) => 8,
            Error::Parse(_) => 9,
            Error::Transform { .. } => 10,
            Error::Signature | Error::Webhook(_) => 11,
        }
    }

    /// Errors that the next trigger is expected to clear without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::FeedTransient { .. } | Error::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::CredentialNotFound("u1".into()).exit_code(), 3);
        assert_eq!(
            Error::Api {
                endpoint: "test".into(),
                status: 404,
                message: "not found".into()
            }
            .exit_code(),
            6
        );
        assert_eq!(Error::Signature.exit_code(), 11);
    }

    #[test]
    fn test_store_write_keeps_source() {
        use std::error::Error as _;

        let err = Error::StoreWrite {
            store: "cursors",
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(err.to_string().contains("cursors"));
        assert!(err.source().is_some());
        assert_eq!(err.exit_code(), 8);
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::FeedTransient {
            endpoint: "/2/files/list_folder".into(),
            message: "rate limited".into()
        }
        .is_transient());
        assert!(!Error::FeedAuth {
            endpoint: "/2/files/list_folder".into(),
            message: "expired".into()
        }
        .is_transient());
        assert!(!Error::CredentialNotFound("u1".into()).is_transient());
        // A path conflict replays the same page on every trigger.
        assert!(!Error::UploadConflict {
            path: "/a.html".into(),
            message: "path/conflict/folder".into()
        }
        .is_transient());
    }
}
