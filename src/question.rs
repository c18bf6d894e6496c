//! String heuristics applied to questions and answers around the stored chunks.
//!
//! These functions hold no state and make no requests; the answering layer composes them.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Word limit applied to long-form answers.
pub const LONG_ANSWER_WORD_LIMIT: usize = 120;

static PERSON_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)+\b").expect("valid person name regex")
});

static META_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)what\s+is\s+(this|ask\s+tgp|the\s+gyaan\s+project|tgp)|how\s+does\s+this\s+work|who\s+(made|created|built)\s+this|what\s+can\s+(i|you)\s+(ask|do)",
    )
    .expect("valid meta question regex")
});

static DESIGN_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)design|art|creative|creativity|craft|architect|typography|illustration|photography|film|music|theatre|dance",
    )
    .expect("valid design keyword regex")
});

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("valid fence regex"));

static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\s*$").expect("valid fence regex"));

/// A retrieved chunk as used for answer context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContextChunk {
    /// Episode the chunk came from.
    pub episode_title: String,
    /// Chunk text.
    pub content: String,
}

/// First run of two or more capitalized words, e.g. `"Rupali Gupte"`.
pub fn extract_person_name(question: &str) -> Option<&str> {
    PERSON_NAME.find(question).map(|found| found.as_str())
}

/// Whether the question asks about the service itself rather than about design.
pub fn is_meta_question(question: &str) -> bool {
    META_QUESTION.is_match(question.trim())
}

/// Whether the question already mentions a design or art topic.
///
/// Matches substrings, so "heart" counts as mentioning art.
pub fn has_design_context(question: &str) -> bool {
    DESIGN_KEYWORDS.is_match(question)
}

/// Limit `text` to `limit` words, preferring to end on a sentence boundary.
///
/// Text within the limit is returned unchanged. Otherwise the first `limit` words are joined
/// by single spaces and cut after the last `". "`, `"! "` or `"? "` when that boundary lies
/// beyond 60% of the truncated length.
pub fn truncate_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return text.to_string();
    }

    let truncated = words[..limit].join(" ");
    let boundary = [". ", "! ", "? "]
        .iter()
        .filter_map(|marker| truncated.rfind(marker))
        .max();

    match boundary {
        Some(index) if index as f64 > truncated.len() as f64 * 0.6 => {
            truncated[..=index].to_string()
        }
        _ => truncated,
    }
}

/// Remove a Markdown code fence wrapped around a model reply.
pub fn strip_code_fences(raw: &str) -> String {
    let without_leading = LEADING_FENCE.replace(raw, "");
    TRAILING_FENCE
        .replace(&without_leading, "")
        .trim()
        .to_string()
}

/// Render chunks as `[From: title]` blocks separated by horizontal rules.
pub fn build_context(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("[From: {}]\n{}", chunk.episode_title, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Distinct episode titles in first-seen order.
pub fn unique_titles(chunks: &[ContextChunk]) -> Vec<&str> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .map(|chunk| chunk.episode_title.as_str())
        .filter(|title| seen.insert(*title))
        .collect()
}
