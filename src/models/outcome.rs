use serde::Serialize;

/// Result of a render call.
///
/// `UnsanitizedFallback` is produced only when every sanitizer failed and the
/// raw content is handed back as a last resort. Callers rendering across a
/// trust boundary should refuse to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RenderOutcome {
    Sanitized { html: String, sanitizer: &'static str },
    UnsanitizedFallback { html: String },
}

impl RenderOutcome {
    pub fn html(&self) -> &str {
        match self {
            RenderOutcome::Sanitized { html, .. } | RenderOutcome::UnsanitizedFallback { html } => {
                html
            }
        }
    }

    pub fn is_sanitized(&self) -> bool {
        matches!(self, RenderOutcome::Sanitized { .. })
    }

    /// Sanitized HTML, or `None` for the unsanitized fallback.
    pub fn safe_html(&self) -> Option<&str> {
        match self {
            RenderOutcome::Sanitized { html, .. } => Some(html),
            RenderOutcome::UnsanitizedFallback { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_tag() {
        let outcome = RenderOutcome::Sanitized {
            html: "<p>x</p>".to_string(),
            sanitizer: "ammonia",
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["kind"], "sanitized");
        assert_eq!(value["html"], "<p>x</p>");
        assert_eq!(value["sanitizer"], "ammonia");

        let fallback = RenderOutcome::UnsanitizedFallback {
            html: "raw".to_string(),
        };
        let value = serde_json::to_value(&fallback).unwrap();
        assert_eq!(value["kind"], "unsanitized-fallback");
    }

    #[test]
    fn safe_html_hides_unsanitized_content() {
        let fallback = RenderOutcome::UnsanitizedFallback {
            html: "<script>x</script>".to_string(),
        };
        assert!(fallback.safe_html().is_none());
        assert!(!fallback.is_sanitized());
        assert_eq!(fallback.html(), "<script>x</script>");
    }
}
