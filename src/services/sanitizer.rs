use crate::error::AppResult;
use crate::models::policy::{SanitizationPolicy, DROP_CONTENT_TAGS, URI_ATTRIBUTES};
use crate::utils::dom::{self, Fragment};
use ammonia::{Builder, UrlRelative};
use std::borrow::Cow;
use std::collections::HashSet;

/// One strategy in the sanitizer chain.
pub trait HtmlSanitizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn sanitize(&self, raw_html: &str, policy: &SanitizationPolicy) -> AppResult<String>;
}

/// Correlation attribute carried through ammonia on iframes only.
const EMBED_REF_ATTR: &str = "data-embed-ref";

/// Iframe attributes re-applied after cleaning.
const PRESERVED_IFRAME_ATTRS: &[&str] = &["width", "height", "frameborder"];

/// Primary sanitizer backed by ammonia.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmmoniaSanitizer;

impl AmmoniaSanitizer {
    pub fn new() -> Self {
        Self
    }

    fn builder(policy: &SanitizationPolicy) -> Builder<'static> {
        let tags: HashSet<&'static str> = policy
            .allowed_tags
            .iter()
            .copied()
            .filter(|tag| !policy.is_forbidden_tag(tag))
            .collect();
        let clean_content_tags: HashSet<&'static str> = policy
            .forbidden_tags
            .iter()
            .chain(DROP_CONTENT_TAGS)
            .copied()
            .collect();
        // `rel` is owned by link_rel below; ammonia refuses to manage both.
        let generic_attributes: HashSet<&'static str> = policy
            .allowed_attributes
            .iter()
            .copied()
            .filter(|attr| *attr != "rel")
            .collect();
        let url_schemes: HashSet<&'static str> = policy.uri_rule.schemes().iter().copied().collect();
        let url_relative = if policy.uri_rule.allows_relative() {
            UrlRelative::PassThrough
        } else {
            UrlRelative::Deny
        };

        let mut builder = Builder::empty();
        builder
            .tags(tags)
            .clean_content_tags(clean_content_tags)
            .generic_attributes(generic_attributes)
            .url_schemes(url_schemes)
            .url_relative(url_relative)
            .link_rel(Some("noopener noreferrer"))
            .strip_comments(true);

        if policy.allows_attribute("style") {
            builder.filter_style_properties(
                policy.allowed_style_properties.iter().copied().collect(),
            );
        }
        if policy.allows_iframe() {
            builder.add_tag_attributes("iframe", &[EMBED_REF_ATTR]);
        }

        let rule = policy.uri_rule.clone();
        builder.attribute_filter(move |_element, attribute, value| {
            if URI_ATTRIBUTES.contains(&attribute) && !rule.permits(value) {
                None
            } else {
                Some(Cow::Borrowed(value))
            }
        });

        builder
    }
}

impl HtmlSanitizer for AmmoniaSanitizer {
    fn name(&self) -> &'static str {
        "ammonia"
    }

    fn sanitize(&self, raw_html: &str, policy: &SanitizationPolicy) -> AppResult<String> {
        if raw_html.is_empty() {
            return Ok(String::new());
        }

        let builder = Self::builder(policy);
        if !policy.allows_iframe() {
            return Ok(builder.clean(raw_html).to_string());
        }

        let guard = IframeGuard::capture(raw_html)?;
        let cleaned = builder.clean(&guard.tagged_html).to_string();
        guard.restore(&cleaned, policy)
    }
}

/// Pre/post pass around ammonia that keeps iframe sizing attributes and drops
/// iframes whose `src` did not survive.
struct IframeGuard {
    tagged_html: String,
    snapshots: Vec<Vec<(&'static str, String)>>,
}

impl IframeGuard {
    fn capture(raw_html: &str) -> AppResult<Self> {
        let fragment = Fragment::parse(raw_html);
        let iframes = dom::elements_by_tag(fragment.root(), "iframe");
        if iframes.is_empty() {
            return Ok(Self {
                tagged_html: raw_html.to_string(),
                snapshots: Vec::new(),
            });
        }

        let mut snapshots = Vec::with_capacity(iframes.len());
        for (index, iframe) in iframes.iter().enumerate() {
            let preserved = PRESERVED_IFRAME_ATTRS
                .iter()
                .filter_map(|name| dom::get_attr(iframe, name).map(|value| (*name, value)))
                .collect();
            snapshots.push(preserved);
            // Overwrites any reference smuggled in by the author.
            dom::set_attr(iframe, EMBED_REF_ATTR, &index.to_string());
        }

        Ok(Self {
            tagged_html: fragment.to_html()?,
            snapshots,
        })
    }

    fn restore(&self, cleaned: &str, policy: &SanitizationPolicy) -> AppResult<String> {
        let fragment = Fragment::parse(cleaned);
        let iframes = dom::elements_by_tag(fragment.root(), "iframe");
        if iframes.is_empty() {
            return Ok(cleaned.to_string());
        }

        for iframe in iframes {
            let reference = dom::get_attr(&iframe, EMBED_REF_ATTR);
            dom::remove_attr(&iframe, EMBED_REF_ATTR);

            let has_src = dom::get_attr(&iframe, "src")
                .is_some_and(|src| policy.uri_rule.permits(&src));
            if !has_src {
                dom::detach(&iframe);
                continue;
            }

            let snapshot = reference
                .and_then(|r| r.parse::<usize>().ok())
                .and_then(|index| self.snapshots.get(index));
            if let Some(preserved) = snapshot {
                for (name, value) in preserved {
                    if policy.allows_attribute(name) {
                        dom::set_attr(&iframe, name, value);
                    }
                }
            }
        }

        fragment.to_html()
    }
}
