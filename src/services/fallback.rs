use crate::error::AppResult;
use crate::models::policy::{SanitizationPolicy, URI_ATTRIBUTES};
use crate::services::sanitizer::HtmlSanitizer;
use crate::utils::dom::{parse_style, render_style, Fragment};
use crate::utils::escape::escape_html;
use html5ever::Attribute;
use markup5ever_rcdom::{Handle, NodeData};

pub const DEFAULT_MAX_DEPTH: usize = 512;

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "wbr", "col", "area", "source", "track"];

/// Style values that can smuggle script or remote loads.
const UNSAFE_STYLE_FRAGMENTS: &[&str] = &["expression(", "url(", "javascript:", "\\", "@import"];

/// Tree-walking allow-list sanitizer built directly on html5ever.
///
/// Shares the policy semantics of the primary sanitizer and serializes its
/// own output, so it does not depend on ammonia's post-processing. Elements
/// nested deeper than `max_depth` are dropped with their content.
#[derive(Debug, Clone, Copy)]
pub struct FallbackSanitizer {
    max_depth: usize,
}

impl Default for FallbackSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackSanitizer {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl HtmlSanitizer for FallbackSanitizer {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn sanitize(&self, raw_html: &str, policy: &SanitizationPolicy) -> AppResult<String> {
        if raw_html.is_empty() {
            return Ok(String::new());
        }

        let fragment = Fragment::parse(raw_html);
        let mut writer = Writer {
            policy,
            max_depth: self.max_depth,
            out: String::with_capacity(raw_html.len()),
            truncated: false,
        };
        writer.children(fragment.root(), 0);

        if writer.truncated {
            tracing::debug!(
                max_depth = self.max_depth,
                "Dropped content nested past the depth limit"
            );
        }
        Ok(writer.out)
    }
}

struct Writer<'a> {
    policy: &'a SanitizationPolicy,
    max_depth: usize,
    out: String,
    truncated: bool,
}

impl Writer<'_> {
    fn children(&mut self, node: &Handle, depth: usize) {
        for child in node.children.borrow().iter() {
            self.node(child, depth);
        }
    }

    fn node(&mut self, node: &Handle, depth: usize) {
        match &node.data {
            NodeData::Text { contents } => {
                self.out.push_str(&escape_html(&contents.borrow()));
            }
            NodeData::Element { name, attrs, .. } => {
                if depth >= self.max_depth {
                    self.truncated = true;
                    return;
                }

                let tag = name.local.to_string().to_ascii_lowercase();
                if self.policy.drops_content(&tag) {
                    return;
                }
                if !self.policy.allows_tag(&tag) {
                    self.children(node, depth + 1);
                    return;
                }

                let kept = keep_attributes(&attrs.borrow(), self.policy);
                if tag == "iframe" && !kept.iter().any(|(name, _)| name == "src") {
                    return;
                }

                self.out.push('<');
                self.out.push_str(&tag);
                for (name, value) in &kept {
                    self.out.push(' ');
                    self.out.push_str(name);
                    self.out.push_str("=\"");
                    self.out.push_str(&escape_html(value));
                    self.out.push('"');
                }
                if tag == "a" {
                    self.out.push_str(" rel=\"noopener noreferrer\"");
                }
                self.out.push('>');

                if VOID_TAGS.contains(&tag.as_ref()) {
                    return;
                }
                // Iframe children are raw text the browser never renders.
                if tag != "iframe" {
                    self.children(node, depth + 1);
                }
                self.out.push_str("</");
                self.out.push_str(&tag);
                self.out.push('>');
            }
            // comments, doctypes, processing instructions
            _ => {}
        }
    }
}

fn keep_attributes(attrs: &[Attribute], policy: &SanitizationPolicy) -> Vec<(String, String)> {
    let mut kept = Vec::new();
    for attr in attrs {
        if !attr.name.ns.is_empty() {
            continue;
        }
        let name = attr.name.local.to_string().to_ascii_lowercase();
        if name == "rel" || !policy.allows_attribute(&name) {
            continue;
        }

        let value = attr.value.to_string();
        if URI_ATTRIBUTES.contains(&name.as_ref()) && !policy.uri_rule.permits(&value) {
            continue;
        }
        if name == "style" {
            if let Some(style) = filter_style(&value, policy) {
                kept.push((name, style));
            }
            continue;
        }
        kept.push((name, value));
    }
    kept
}

fn filter_style(value: &str, policy: &SanitizationPolicy) -> Option<String> {
    let declarations: Vec<_> = parse_style(value)
        .into_iter()
        .filter(|(property, value)| {
            let lowered: String = value
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            policy.allows_style_property(property)
                && !UNSAFE_STYLE_FRAGMENTS.iter().any(|f| lowered.contains(f))
        })
        .collect();

    if declarations.is_empty() {
        None
    } else {
        Some(render_style(&declarations))
    }
}
