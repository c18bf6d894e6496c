//! Word-count chunking.
//!
//! Text is split on Unicode whitespace and regrouped into consecutive, non-overlapping windows of
//! at most `words_per_chunk` tokens joined by single spaces. [`WordChunks`] borrows the source
//! text and produces chunks lazily, so callers can stream batches without materialising the whole
//! document twice; iterating it again restarts from the first word.

use std::iter::FusedIterator;
use std::str::SplitWhitespace;

use super::types::ChunkingError;

/// Lazily produced, restartable sequence of word-count chunks over a borrowed text.
#[derive(Debug, Clone, Copy)]
pub struct WordChunks<'a> {
    text: &'a str,
    words_per_chunk: usize,
}

impl<'a> WordChunks<'a> {
    /// Start a fresh pass over the chunks.
    pub fn iter(&self) -> WordChunkIter<'a> {
        WordChunkIter {
            words: self.text.split_whitespace(),
            words_per_chunk: self.words_per_chunk,
        }
    }

    /// Number of chunks a full pass yields: `ceil(words / words_per_chunk)`.
    pub fn count_hint(&self) -> usize {
        self.text
            .split_whitespace()
            .count()
            .div_ceil(self.words_per_chunk)
    }

    /// Words packed into every chunk except possibly the last.
    pub fn words_per_chunk(&self) -> usize {
        self.words_per_chunk
    }
}

impl<'a> IntoIterator for WordChunks<'a> {
    type Item = String;
    type IntoIter = WordChunkIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &WordChunks<'a> {
    type Item = String;
    type IntoIter = WordChunkIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Single pass over a [`WordChunks`] sequence.
#[derive(Debug, Clone)]
pub struct WordChunkIter<'a> {
    words: SplitWhitespace<'a>,
    words_per_chunk: usize,
}

impl Iterator for WordChunkIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.words.next()?;
        let mut chunk = String::from(first);
        for word in self.words.by_ref().take(self.words_per_chunk - 1) {
            chunk.push(' ');
            chunk.push_str(word);
        }
        Some(chunk)
    }
}

impl FusedIterator for WordChunkIter<'_> {}

/// Split `text` into chunks of at most `words_per_chunk` whitespace-delimited words.
///
/// Whitespace-only input yields an empty sequence.
pub fn chunk_words(text: &str, words_per_chunk: usize) -> Result<WordChunks<'_>, ChunkingError> {
    if words_per_chunk == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    Ok(WordChunks {
        text,
        words_per_chunk,
    })
}
