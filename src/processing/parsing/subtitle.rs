use std::sync::LazyLock;

use regex::Regex;

use super::markup::strip_tags;

static CUE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\d+\n\d{2}:\d{2}:\d{2}[,.]\d{3} --> \d{2}:\d{2}:\d{2}[,.]\d{3}[^\n]*(?:\n|$)",
    )
    .expect("cue header pattern is valid")
});

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("blank run pattern is valid"));

/// Reduce an SRT subtitle file to its dialogue.
///
/// Cue indices, timestamp ranges, and markup tags are dropped; blank-line runs between cues
/// collapse into single spaces.
pub fn parse_srt(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n");
    let without_cues = CUE_HEADER.replace_all(&normalized, "");
    let without_tags = strip_tags(&without_cues, "");
    BLANK_RUNS
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cue_reduces_to_dialogue() {
        let text = parse_srt("1\n00:00:01,000 --> 00:00:02,000\nHello <i>world</i>\n\n");
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn multiple_cues_are_joined_with_spaces() {
        let srt = "1\n00:00:01,000 --> 00:00:02,500\nDesign is a verb.\n\n\
                   2\n00:00:02,600 --> 00:00:04,000\n<b>Not</b> a noun.\n\n\
                   3\n00:00:04,100 --> 00:00:06,000\n<font color=\"red\">Slow</font> down.\n";
        let text = parse_srt(srt);
        assert_eq!(text, "Design is a verb. Not a noun. Slow down.");
    }

    #[test]
    fn windows_line_endings_are_handled() {
        let srt = "1\r\n00:00:01,000 --> 00:00:02,000\r\nHi there\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nBye\r\n";
        assert_eq!(parse_srt(srt), "Hi there Bye");
    }

    #[test]
    fn no_timestamps_survive() {
        let srt = "10\n01:02:03,004 --> 01:02:05,006 X1:10 X2:20\nLine\n\n11\n01:02:06,000 --> 01:02:07,000\nLast";
        let text = parse_srt(srt);
        assert!(!text.contains("-->"));
        assert!(!text.contains("01:02"));
        assert_eq!(text, "Line Last");
    }
}
