use crate::utils::dom::{self, Fragment};

pub const DEFAULT_EXCERPT_LENGTH: usize = 150;

const ELLIPSIS: &str = "...";

/// Turns sanitized HTML into a bounded plain-text excerpt.
#[derive(Debug, Clone, Copy)]
pub struct ContentPreviewExtractor {
    max_length: usize,
}

impl Default for ContentPreviewExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EXCERPT_LENGTH)
    }
}

impl ContentPreviewExtractor {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn extract(&self, sanitized_html: &str) -> String {
        truncate(&plain_text(sanitized_html), self.max_length)
    }
}

/// Text content of an HTML fragment, trimmed at both ends.
pub fn plain_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let fragment = Fragment::parse(html);
    dom::text_content(fragment.root()).trim().to_string()
}

/// First `max_length` characters followed by `...`, or `text` unchanged when
/// it already fits.
pub fn truncate(text: &str, max_length: usize) -> String {
    match text.char_indices().nth(max_length) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_unchanged() {
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("", 5), "");
    }

    #[test]
    fn long_text_cut_with_ellipsis() {
        let out = truncate(&"a".repeat(200), 150);
        assert_eq!(out.chars().count(), 153);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("日本語", 3), "日本語");
    }

    #[test]
    fn plain_text_trims_and_skips_markup() {
        let text = plain_text("\n<h1>Title</h1>\n<p>Body <strong>text</strong></p>\n");
        assert_eq!(text, "Title\nBody text");
    }

    #[test]
    fn entities_decoded() {
        assert_eq!(plain_text("<p>a &amp; b &lt;c&gt;</p>"), "a & b <c>");
    }

    #[test]
    fn extractor_uses_configured_length() {
        let extractor = ContentPreviewExtractor::new(4);
        assert_eq!(extractor.extract("<p>abcdef</p>"), "abcd...");
        let long = format!("<p>{}</p>", "a".repeat(200));
        assert_eq!(ContentPreviewExtractor::default().extract(&long).chars().count(), 153);
    }
}
