//! Plain-text extraction for the supported source formats.

mod epub;
mod markup;
mod subtitle;
mod word;

use std::path::Path;

use super::types::{DocumentFormat, ParseError};

pub use subtitle::parse_srt;

/// Extract the plain text of the document stored at `path`.
///
/// Blocking: callers on an async runtime should run this on a blocking thread.
pub fn parse_file(path: &Path, format: DocumentFormat) -> Result<String, ParseError> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes, format)
}

/// Extract the plain text of an in-memory document.
pub fn parse_bytes(bytes: &[u8], format: DocumentFormat) -> Result<String, ParseError> {
    match format {
        DocumentFormat::PlainText => Ok(decode_text(bytes)),
        DocumentFormat::Subtitle => Ok(parse_srt(&decode_text(bytes))),
        DocumentFormat::Pdf => parse_pdf(bytes),
        DocumentFormat::Word => word::extract_text(bytes),
        DocumentFormat::Epub => epub::extract_text(bytes),
    }
}

fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn parse_pdf(bytes: &[u8]) -> Result<String, ParseError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|err| ParseError::Pdf(err.to_string()))?;
    Ok(text.replace('\0', ""))
}
