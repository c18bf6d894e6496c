//! Ingestion service coordinating download, parsing, chunking, embedding, and storage.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::{
    config::{Config, DEFAULT_BATCH_PAUSE, DEFAULT_BATCH_SIZE, DEFAULT_WORDS_PER_CHUNK},
    drive::{DriveError, RemoteFile, SourceFolder},
    embedding::EmbeddingClient,
    metrics::{IngestMetrics, MetricsSnapshot},
    processing::{
        chunking::chunk_words,
        parsing::parse_file,
        types::{DocumentFormat, ParseError, episode_title},
    },
    supabase::{ChunkRow, ChunkStore},
};

/// Errors that abort a whole ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source folder could not be listed.
    #[error("Failed to list source folder: {0}")]
    Listing(#[from] DriveError),
}

/// Failures that abandon a single file.
#[derive(Debug, Error)]
enum FetchError {
    #[error("download failed: {0}")]
    Download(#[from] DriveError),
    #[error("scratch file unavailable: {0}")]
    Scratch(#[from] std::io::Error),
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("parser task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Tunables for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Words per chunk.
    pub words_per_chunk: usize,
    /// Chunks embedded and inserted per request.
    pub batch_size: usize,
    /// Pause before every embedding batch except the ingestor's first.
    pub batch_pause: Duration,
    /// Directory for scratch downloads; the system temp directory when `None`.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            words_per_chunk: DEFAULT_WORDS_PER_CHUNK,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
            scratch_dir: None,
        }
    }
}

impl IngestSettings {
    /// Derive settings from the run configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            words_per_chunk: config.words_per_chunk,
            batch_size: config.batch_size,
            batch_pause: config.batch_pause,
            scratch_dir: None,
        }
    }
}

/// Why a file was deliberately left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension is not one of the supported formats.
    Unsupported,
    /// At least one chunk row already exists for the file name.
    AlreadyIngested,
    /// Parsing produced no text.
    EmptyText,
}

/// Result of processing one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Chunks were embedded; `stored` counts rows the store accepted.
    Ingested {
        /// Chunks produced from the document.
        chunks: usize,
        /// Chunk rows written successfully.
        stored: usize,
    },
    /// The file was skipped without error.
    Skipped(SkipReason),
    /// The file was abandoned; the message describes the failure.
    Failed(String),
}

/// Per-file entry of an [`IngestReport`].
#[derive(Debug, Clone)]
pub struct FileReport {
    /// Source file name.
    pub file_name: String,
    /// What happened to it.
    pub outcome: FileOutcome,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Outcomes in listing order.
    pub files: Vec<FileReport>,
    /// Counters at the end of the run.
    pub metrics: MetricsSnapshot,
}

/// Drives ingestion of every file in a source folder, one file and one batch at a time.
///
/// The service owns the folder, embedding, and storage clients; construct it once per run.
pub struct Ingestor {
    folder: Box<dyn SourceFolder>,
    embedding_client: Box<dyn EmbeddingClient>,
    store: Box<dyn ChunkStore>,
    settings: IngestSettings,
    metrics: IngestMetrics,
    embedded_before: AtomicBool,
}

impl Ingestor {
    /// Assemble an ingestor from its collaborators.
    pub fn new(
        folder: Box<dyn SourceFolder>,
        embedding_client: Box<dyn EmbeddingClient>,
        store: Box<dyn ChunkStore>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            folder,
            embedding_client,
            store,
            settings,
            metrics: IngestMetrics::new(),
            embedded_before: AtomicBool::new(false),
        }
    }

    /// Ingest every file in the folder, continuing past per-file failures.
    ///
    /// Counters in the returned report cover this run only.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        self.metrics.reset();
        tracing::info!("Fetching files from source folder");
        let files = self.folder.list_files().await?;
        tracing::info!(files = files.len(), "Found files");

        let mut reports = Vec::with_capacity(files.len());
        for file in files {
            self.metrics.record_seen();
            let outcome = self.ingest_file(&file).await;
            match &outcome {
                FileOutcome::Ingested { .. } => self.metrics.record_ingested(),
                FileOutcome::Skipped(_) => self.metrics.record_skipped(),
                FileOutcome::Failed(_) => self.metrics.record_failed(),
            }
            reports.push(FileReport {
                file_name: file.name,
                outcome,
            });
        }

        let metrics = self.metrics.snapshot();
        tracing::info!(
            seen = metrics.files_seen,
            ingested = metrics.files_ingested,
            skipped = metrics.files_skipped,
            failed = metrics.files_failed,
            chunks_stored = metrics.chunks_stored,
            batches_failed = metrics.batches_failed,
            "Ingestion complete"
        );
        Ok(IngestReport {
            files: reports,
            metrics,
        })
    }

    /// Ingest a single file unless it is unsupported or already stored.
    pub async fn ingest_file(&self, file: &RemoteFile) -> FileOutcome {
        let Some(format) = DocumentFormat::from_file_name(&file.name) else {
            tracing::info!(file = %file.name, "Skipping (unsupported format)");
            return FileOutcome::Skipped(SkipReason::Unsupported);
        };

        match self.store.count_chunks(&file.name).await {
            Ok(0) => {}
            Ok(existing) => {
                tracing::info!(file = %file.name, existing, "Already ingested");
                return FileOutcome::Skipped(SkipReason::AlreadyIngested);
            }
            Err(error) => {
                tracing::error!(file = %file.name, error = %error, "Ingestion check failed");
                return FileOutcome::Failed(error.to_string());
            }
        }

        tracing::info!(file = %file.name, %format, "Downloading");
        let text = match self.fetch_text(file, format).await {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(file = %file.name, error = %error, "Failed to extract text");
                return FileOutcome::Failed(error.to_string());
            }
        };

        if text.trim().is_empty() {
            tracing::warn!(file = %file.name, "No text extracted");
            return FileOutcome::Skipped(SkipReason::EmptyText);
        }

        let outcome = self.embed_and_store(file, &text).await;
        if let FileOutcome::Ingested { chunks, stored } = outcome {
            tracing::info!(file = %file.name, chunks, stored, "Done");
        }
        outcome
    }

    async fn fetch_text(
        &self,
        file: &RemoteFile,
        format: DocumentFormat,
    ) -> Result<String, FetchError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tgp-ingest-");
        let scratch = match &self.settings.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let bytes = self.folder.download(file, scratch.path()).await?;
        tracing::debug!(file = %file.name, bytes, "Parsing scratch copy");

        // The scratch copy is removed when `scratch` drops at the end of the task.
        let text = tokio::task::spawn_blocking(move || parse_file(scratch.path(), format)).await??;
        Ok(text)
    }

    /// Space embedding requests across batches and files alike.
    async fn pace(&self) {
        let sent_before = self.embedded_before.swap(true, Ordering::Relaxed);
        if sent_before && !self.settings.batch_pause.is_zero() {
            tokio::time::sleep(self.settings.batch_pause).await;
        }
    }

    async fn embed_and_store(&self, file: &RemoteFile, text: &str) -> FileOutcome {
        let chunks = match chunk_words(text, self.settings.words_per_chunk) {
            Ok(chunks) => chunks,
            Err(error) => return FileOutcome::Failed(error.to_string()),
        };
        let total = chunks.count_hint();
        tracing::info!(file = %file.name, chunks = total, "Embedding");

        let title = episode_title(&file.name);
        let batch_size = self.settings.batch_size.max(1);
        let mut pending = chunks.iter();
        let mut start = 0usize;
        let mut stored = 0usize;

        loop {
            let batch: Vec<String> = pending.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            self.pace().await;

            let embeddings = match self.embedding_client.generate_embeddings(&batch).await {
                Ok(embeddings) => embeddings,
                Err(error) => {
                    tracing::error!(file = %file.name, first_chunk = start, error = %error, "Embedding failed");
                    return FileOutcome::Failed(error.to_string());
                }
            };
            if embeddings.len() != batch.len() {
                let message = format!(
                    "embedding client returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                );
                tracing::error!(file = %file.name, first_chunk = start, "{message}");
                return FileOutcome::Failed(message);
            }

            let batch_len = batch.len();
            let rows: Vec<ChunkRow> = batch
                .into_iter()
                .zip(embeddings)
                .enumerate()
                .map(|(offset, (content, embedding))| ChunkRow {
                    file_name: file.name.clone(),
                    episode_title: title.to_string(),
                    chunk_index: start + offset,
                    content,
                    embedding,
                })
                .collect();

            match self.store.insert_chunks(&rows).await {
                Ok(()) => {
                    stored += batch_len;
                    self.metrics.record_stored(batch_len as u64);
                    tracing::info!(
                        file = %file.name,
                        "Stored chunks {}-{}",
                        start + 1,
                        start + batch_len
                    );
                }
                Err(error) => {
                    self.metrics.record_batch_failed();
                    tracing::error!(file = %file.name, first_chunk = start, error = %error, "Insert error");
                }
            }
            start += batch_len;
        }

        FileOutcome::Ingested {
            chunks: start,
            stored,
        }
    }
}
