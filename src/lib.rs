#![deny(missing_docs)]

//! Core library for the transcript ingestion pipeline.

/// Environment-driven configuration management.
pub mod config;
/// Google Drive source folder access.
pub mod drive;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Heuristics for questions and answers over the stored chunks.
pub mod question;
/// Supabase chunk persistence.
pub mod supabase;
