//! Document processing pipeline: parsing, chunking, and ingestion orchestration.

pub mod chunking;
pub mod parsing;
mod service;
pub mod types;

pub use chunking::{WordChunks, chunk_words};
pub use parsing::{parse_bytes, parse_file};
pub use service::{
    FileOutcome, FileReport, IngestError, IngestReport, IngestSettings, Ingestor, SkipReason,
};
pub use types::{ChunkingError, DocumentFormat, ParseError, episode_title};
