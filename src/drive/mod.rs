//! Remote source folder backed by Google Drive.

pub mod auth;
pub mod client;

use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

pub use auth::{AccessTokenSource, ServiceAccountAuth, StaticToken};
pub use client::GoogleDriveFolder;

/// Errors returned while listing or downloading source documents.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Drive URL: {0}")]
    InvalidUrl(String),
    /// Service account credentials were rejected or could not be used.
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Drive responded with an unexpected status code.
    #[error("Unexpected Drive response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Drive.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The downloaded bytes could not be written locally.
    #[error("Failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

/// A file listed in the source folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Provider-assigned identifier used for downloads.
    pub id: String,
    /// File name including extension.
    pub name: String,
    /// Media type reported by the provider.
    pub mime_type: Option<String>,
}

/// A read-only, non-recursive folder of source documents.
#[async_trait]
pub trait SourceFolder: Send + Sync {
    /// List every file directly inside the folder.
    async fn list_files(&self) -> Result<Vec<RemoteFile>, DriveError>;

    /// Download `file` to `destination`, returning the number of bytes written.
    async fn download(&self, file: &RemoteFile, destination: &Path) -> Result<u64, DriveError>;
}
