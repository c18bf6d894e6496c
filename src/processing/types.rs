//! Core data types and error definitions for the processing pipeline.

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors produced while turning raw text into word-count chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors raised while extracting text from a source document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The scratch copy could not be read.
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
    /// PDF text extraction failed.
    #[error("failed to extract PDF text: {0}")]
    Pdf(String),
    /// Word document could not be decoded.
    #[error("failed to read Word document: {0}")]
    Word(String),
    /// EPUB archive or package document was malformed.
    #[error("failed to read EPUB: {0}")]
    Epub(String),
}

/// Source formats the parser understands, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// `.txt`
    PlainText,
    /// `.srt`
    Subtitle,
    /// `.pdf`
    Pdf,
    /// `.doc` and `.docx`
    Word,
    /// `.epub`
    Epub,
}

impl DocumentFormat {
    /// Map a file name to its format, returning `None` for unsupported extensions.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(Self::PlainText),
            "srt" => Some(Self::Subtitle),
            "pdf" => Some(Self::Pdf),
            "doc" | "docx" => Some(Self::Word),
            "epub" => Some(Self::Epub),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PlainText => "text",
            Self::Subtitle => "subtitle",
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Epub => "epub",
        };
        f.write_str(label)
    }
}

/// Strip the final extension from a file name to obtain the episode title.
pub fn episode_title(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(index) => &file_name[..index],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_follow_lowercased_extension() {
        assert_eq!(
            DocumentFormat::from_file_name("Talk.TXT"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_file_name("ep 12.srt"),
            Some(DocumentFormat::Subtitle)
        );
        assert_eq!(
            DocumentFormat::from_file_name("paper.pdf"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_file_name("notes.doc"),
            Some(DocumentFormat::Word)
        );
        assert_eq!(
            DocumentFormat::from_file_name("notes.docx"),
            Some(DocumentFormat::Word)
        );
        assert_eq!(
            DocumentFormat::from_file_name("book.epub"),
            Some(DocumentFormat::Epub)
        );
    }

    #[test]
    fn unsupported_or_missing_extensions_are_none() {
        assert_eq!(DocumentFormat::from_file_name("cover.png"), None);
        assert_eq!(DocumentFormat::from_file_name("README"), None);
        assert_eq!(DocumentFormat::from_file_name(".txt"), None);
    }

    #[test]
    fn episode_title_drops_only_last_extension() {
        assert_eq!(episode_title("Rupali Gupte.srt"), "Rupali Gupte");
        assert_eq!(episode_title("ep.1.final.pdf"), "ep.1.final");
        assert_eq!(episode_title("README"), "README");
    }
}
