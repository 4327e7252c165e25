use crate::error::AppResult;
use crate::models::policy::SanitizationPolicy;
use crate::utils::dom::{self, Fragment};
use crate::utils::markdown::MarkdownConverter;
use crate::utils::uri::is_borderless_embed;
use markup5ever_rcdom::Handle;

const FRAMED_BORDER: &str = "1px solid #e5e7eb";

/// Sizing attributes of one iframe as written in the original content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedAttributeSnapshot {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frameborder: Option<String>,
}

impl EmbedAttributeSnapshot {
    /// Iframes of `original_raw`, in document order, that can survive
    /// sanitizing under `policy`.
    ///
    /// The original is converted and parsed the same way rendering does, so
    /// iframe markup that only appears as text (code spans, fenced blocks,
    /// script bodies) is not counted. Iframes inside content-dropping
    /// elements or with a `src` failing the URI rule are skipped too, which
    /// keeps the list aligned with the rendered iframes.
    pub fn scan(original_raw: &str, policy: &SanitizationPolicy) -> Vec<Self> {
        if original_raw.is_empty() {
            return Vec::new();
        }
        let html = MarkdownConverter::new().to_raw_html(original_raw);
        let fragment = Fragment::parse(&html);
        dom::elements_by_tag_outside(fragment.root(), "iframe", |tag| policy.drops_content(tag))
            .iter()
            .filter(|iframe| {
                dom::get_attr(iframe, "src").is_some_and(|src| policy.uri_rule.permits(&src))
            })
            .map(Self::from_element)
            .collect()
    }

    pub fn from_element(iframe: &Handle) -> Self {
        let number = |name: &str| dom::get_attr(iframe, name).and_then(|v| leading_number(&v));
        Self {
            width: number("width"),
            height: number("height"),
            frameborder: dom::get_attr(iframe, "frameborder").filter(|v| !v.trim().is_empty()),
        }
    }
}

/// `560` for `"560"`, `"560px"` or `" 560 "`.
fn leading_number(value: &str) -> Option<u32> {
    let value = value.trim();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Re-applies iframe sizing and the per-host frame styling to rendered
/// content, using the original raw content as the source of truth.
#[derive(Debug, Clone)]
pub struct EmbedAttributeRestorer {
    policy: SanitizationPolicy,
}

impl Default for EmbedAttributeRestorer {
    fn default() -> Self {
        Self::new(SanitizationPolicy::rich_embed())
    }
}

impl EmbedAttributeRestorer {
    pub fn new(policy: SanitizationPolicy) -> Self {
        Self { policy }
    }

    /// Safe to call repeatedly on the same root.
    pub fn restore(&self, root: &Handle, original_raw: &str) {
        let iframes = dom::elements_by_tag(root, "iframe");
        if iframes.is_empty() {
            return;
        }

        let snapshots = EmbedAttributeSnapshot::scan(original_raw, &self.policy);
        if snapshots.len() < iframes.len() {
            tracing::debug!(
                rendered = iframes.len(),
                original = snapshots.len(),
                "fewer original iframe tags than rendered iframes, styling only for the rest"
            );
        }

        for (index, iframe) in iframes.iter().enumerate() {
            if let Some(snapshot) = snapshots.get(index) {
                apply_snapshot(iframe, snapshot);
            }
            apply_frame_style(iframe);
        }
    }

    /// Parse `html`, restore it and serialize it back.
    pub fn restore_html(&self, html: &str, original_raw: &str) -> AppResult<String> {
        let fragment = Fragment::parse(html);
        self.restore(fragment.root(), original_raw);
        fragment.to_html()
    }
}

fn apply_snapshot(iframe: &Handle, snapshot: &EmbedAttributeSnapshot) {
    if let Some(width) = snapshot.width {
        dom::set_attr(iframe, "width", &width.to_string());
        dom::set_style_property(iframe, "width", &format!("{}px", width));
    }
    if let Some(height) = snapshot.height {
        dom::set_attr(iframe, "height", &height.to_string());
        dom::set_style_property(iframe, "height", &format!("{}px", height));
    }
    if let Some(frameborder) = &snapshot.frameborder {
        dom::set_attr(iframe, "frameborder", frameborder);
    }
}

fn apply_frame_style(iframe: &Handle) {
    let src = dom::get_attr(iframe, "src").unwrap_or_default();
    let border = if is_borderless_embed(&src) {
        "none"
    } else {
        FRAMED_BORDER
    };

    dom::set_style_property(iframe, "border", border);
    dom::set_style_property(iframe, "border-radius", "8px");
    dom::set_style_property(iframe, "display", "block");
    dom::set_style_property(iframe, "margin", "16px 0");
    dom::set_style_property(iframe, "max-width", "100%");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_iframe(html: &str) -> EmbedAttributeSnapshot {
        let fragment = Fragment::parse(html);
        EmbedAttributeSnapshot::from_element(&dom::elements_by_tag(fragment.root(), "iframe")[0])
    }

    fn widths(raw: &str) -> Vec<Option<u32>> {
        EmbedAttributeSnapshot::scan(raw, &SanitizationPolicy::rich_embed())
            .into_iter()
            .map(|s| s.width)
            .collect()
    }

    #[test]
    fn snapshot_from_element() {
        let snap = first_iframe(
            r#"<iframe src="https://youtu.be/x" WIDTH=560 height='315px' frameborder="0" style="max-width: 99">"#,
        );
        assert_eq!(snap.width, Some(560));
        assert_eq!(snap.height, Some(315));
        assert_eq!(snap.frameborder.as_deref(), Some("0"));
    }

    #[test]
    fn max_width_in_style_is_not_a_width() {
        let snap = first_iframe(r#"<iframe src="https://youtu.be/x" style="max-width:100" width="auto">"#);
        assert_eq!(snap.width, None);
        assert_eq!(snap.frameborder, None);
    }

    #[test]
    fn scan_skips_untrusted_iframes() {
        let raw = r#"<iframe src="https://evil.example/x" width="1"></iframe>
<iframe src="https://www.youtube.com/embed/a" width="2"></iframe>
<iframe width="3"></iframe>
<IFRAME SRC='https://player.vimeo.com/video/1' width="4"></IFRAME>"#;
        assert_eq!(widths(raw), vec![Some(2), Some(4)]);
    }

    #[test]
    fn scan_ignores_iframes_written_as_text() {
        let raw = r#"Use `<iframe src="https://www.youtube.com/embed/a" width="1">` like this:

```html
<iframe src="https://www.youtube.com/embed/b" width="2"></iframe>
```

<script>document.write('<iframe src="https://www.youtube.com/embed/c" width="3">')</script>

<!-- <iframe src="https://www.youtube.com/embed/d" width="4"> -->

<iframe src="https://www.youtube.com/embed/e" width="560"></iframe>"#;
        assert_eq!(widths(raw), vec![Some(560)]);
    }

    #[test]
    fn scan_skips_iframes_inside_dropped_elements() {
        let raw = r#"<svg><iframe src="https://www.youtube.com/embed/a" width="1"></iframe></svg>
<iframe src="https://www.youtube.com/embed/b" width="2"></iframe>"#;
        assert_eq!(widths(raw), vec![Some(2)]);
    }

    #[test]
    fn restore_sets_size_and_borderless_style() {
        let original = r#"<iframe src="https://store.steampowered.com/widget/123" width="400" height="300"></iframe>"#;
        let html = EmbedAttributeRestorer::default()
            .restore_html(
                r#"<iframe src="https://store.steampowered.com/widget/123"></iframe>"#,
                original,
            )
            .unwrap();
        assert!(html.contains(r#"width="400""#));
        assert!(html.contains(r#"height="300""#));
        assert!(html.contains("width: 400px;"));
        assert!(html.contains("height: 300px;"));
        assert!(html.contains("border: none;"));
        assert!(html.contains("display: block;"));
    }

    #[test]
    fn other_hosts_get_framed_box() {
        let original = r#"<iframe src="https://codepen.io/pen/1"></iframe>"#;
        let html = EmbedAttributeRestorer::default()
            .restore_html(original, original)
            .unwrap();
        assert!(html.contains("border: 1px solid #e5e7eb;"));
        assert!(html.contains("border-radius: 8px;"));
    }

    #[test]
    fn missing_original_still_styles() {
        let fragment = Fragment::parse(r#"<iframe src="https://youtu.be/x"></iframe>"#);
        EmbedAttributeRestorer::default().restore(fragment.root(), "");
        let iframe = &dom::elements_by_tag(fragment.root(), "iframe")[0];
        assert_eq!(dom::get_attr(iframe, "width"), None);
        let style = dom::get_attr(iframe, "style").unwrap();
        assert!(style.starts_with("border: none;"));
        assert!(style.ends_with("max-width: 100%;"));
    }

    #[test]
    fn restore_is_idempotent() {
        let original = r#"<iframe src="https://youtu.be/x" width="560" height="315"></iframe>"#;
        let restorer = EmbedAttributeRestorer::default();
        let fragment = Fragment::parse(original);
        restorer.restore(fragment.root(), original);
        let once = fragment.to_html().unwrap();
        restorer.restore(fragment.root(), original);
        assert_eq!(fragment.to_html().unwrap(), once);
    }
}
