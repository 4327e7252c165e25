use crate::error::{AppError, AppResult};
use comrak::{markdown_to_html, Options};
use std::panic::{self, AssertUnwindSafe};

/// Converts Markdown to raw, still untrusted HTML.
///
/// Uses comrak for GFM-compatible parsing (tables, strikethrough, autolink)
/// with hard line breaks. Raw HTML in the source is emitted verbatim so that
/// embeds written as HTML reach the sanitizer as real elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownConverter;

impl MarkdownConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert, reporting a parser failure to the caller.
    pub fn try_convert(&self, markdown: &str) -> AppResult<String> {
        if markdown.is_empty() {
            return Ok(String::new());
        }

        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.render.hardbreaks = true;
        options.render.unsafe_ = true; // let comrak emit raw HTML; the sanitizer decides what stays

        panic::catch_unwind(AssertUnwindSafe(|| markdown_to_html(markdown, &options))).map_err(
            |payload| {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "parser panicked".to_string());
                AppError::Conversion(reason)
            },
        )
    }

    /// Convert, falling back to the unchanged input if the parser fails.
    pub fn to_raw_html(&self, markdown: &str) -> String {
        match self.try_convert(markdown) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Markdown conversion failed, using raw input: {}", e);
                markdown.to_string()
            }
        }
    }
}
