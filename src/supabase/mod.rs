//! Chunk persistence backed by Supabase (PostgREST).

pub mod client;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

pub use client::SupabaseStore;

/// Errors returned while reading or writing chunk rows.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Supabase URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Supabase responded with an unexpected status code.
    #[error("Unexpected Supabase response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Supabase.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The exact row count was missing from the response.
    #[error("Missing or malformed row count: {0}")]
    MissingCount(String),
}

/// One embedded chunk of a source document, as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkRow {
    /// Source file name, the idempotency key.
    pub file_name: String,
    /// File name without its extension.
    pub episode_title: String,
    /// Zero-based position of the chunk within its file.
    pub chunk_index: usize,
    /// Chunk text.
    pub content: String,
    /// Embedding vector for `content`.
    pub embedding: Vec<f32>,
}

/// Storage for chunk rows.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Count the rows stored for `file_name`.
    async fn count_chunks(&self, file_name: &str) -> Result<u64, StoreError>;

    /// Insert a batch of rows in one request.
    async fn insert_chunks(&self, rows: &[ChunkRow]) -> Result<(), StoreError>;
}
