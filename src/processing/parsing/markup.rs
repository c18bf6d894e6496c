use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

/// Replace every `<...>` tag with `replacement`.
pub(crate) fn strip_tags<'a>(text: &'a str, replacement: &str) -> Cow<'a, str> {
    TAG.replace_all(text, replacement)
}

/// Decode the handful of entities that commonly survive in chapter markup.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_replaced() {
        assert_eq!(strip_tags("<p>a<br/>b</p>", " "), " a b ");
        assert_eq!(strip_tags("plain", " "), "plain");
    }

    #[test]
    fn ampersand_is_decoded_last() {
        assert_eq!(decode_entities("A &amp;lt; B &amp; C"), "A &lt; B & C");
        assert_eq!(decode_entities("x&nbsp;y"), "x y");
    }
}
