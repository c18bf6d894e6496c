//! Embedding client abstraction and the hosted Voyage AI adapter.

mod retry;
mod voyage;

use async_trait::async_trait;
use thiserror::Error;

pub use retry::{Exhausted, RetryPolicy};
pub use voyage::VoyageClient;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// The HTTP client could not be constructed from the supplied settings.
    #[error("Invalid embedding client configuration: {0}")]
    InvalidConfiguration(String),
    /// Caller submitted more inputs than the provider accepts per request.
    #[error("Embedding batch of {size} exceeds the configured maximum of {max}")]
    BatchTooLarge {
        /// Inputs in the rejected batch.
        size: usize,
        /// Configured per-request maximum.
        max: usize,
    },
    /// Every attempt failed; no vectors were produced for the batch.
    #[error("Embedding failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made before giving up.
        attempts: usize,
        /// Description of the last failure.
        last_error: String,
    },
}

/// Interface implemented by embedding backends.
///
/// Implementations return exactly one vector per input, in input order, or an error.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}
