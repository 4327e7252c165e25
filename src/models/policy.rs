use crate::utils::uri::UriRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const BASE_TAGS: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "br",
    "hr",
    "strong",
    "em",
    "u",
    "s",
    "del",
    "code",
    "pre",
    "ul",
    "ol",
    "li",
    "a",
    "img",
    "blockquote",
    "table",
    "thead",
    "tbody",
    "tr",
    "th",
    "td",
    "div",
    "span",
];

const BASE_ATTRIBUTES: &[&str] = &[
    "href", "src", "alt", "title", "class", "id", "target", "rel", "width", "height",
];

const EMBED_ATTRIBUTES: &[&str] = &[
    "frameborder",
    "allowfullscreen",
    "allow",
    "loading",
    "referrerpolicy",
    "style",
];

const FORBIDDEN_TAGS: &[&str] = &["script", "style", "object", "embed", "link", "meta", "base"];

/// Removed with their content under every policy, on top of the forbidden set.
pub const DROP_CONTENT_TAGS: &[&str] = &[
    "noscript", "template", "svg", "math", "applet", "frame", "frameset", "noembed", "noframes",
];

const STYLE_PROPERTIES: &[&str] = &[
    "width",
    "height",
    "max-width",
    "border",
    "border-radius",
    "display",
    "margin",
    "padding",
    "text-align",
    "color",
    "background-color",
    "font-weight",
    "font-style",
    "text-decoration",
];

/// Attributes whose value is a URL and must pass the policy's [`UriRule`].
pub const URI_ATTRIBUTES: &[&str] = &["href", "src"];

/// Which of the two named policies to sanitize with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Regular content and comments: no iframes, no inline style.
    Strict,
    /// Post and article bodies: trusted iframes and inline style allowed.
    RichEmbed,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Strict => "strict",
            PolicyKind::RichEmbed => "rich-embed",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(PolicyKind::Strict),
            "rich-embed" | "rich_embed" | "rich" => Ok(PolicyKind::RichEmbed),
            other => Err(format!(
                "unknown policy '{}', expected strict or rich-embed",
                other
            )),
        }
    }
}

/// Allow-list configuration shared by the primary and fallback sanitizers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationPolicy {
    pub kind: PolicyKind,
    pub allowed_tags: BTreeSet<&'static str>,
    pub allowed_attributes: BTreeSet<&'static str>,
    /// Removed together with their content, even when also allow-listed.
    pub forbidden_tags: BTreeSet<&'static str>,
    pub allowed_style_properties: BTreeSet<&'static str>,
    pub uri_rule: UriRule,
}

impl SanitizationPolicy {
    pub fn strict() -> Self {
        let mut forbidden_tags: BTreeSet<_> = FORBIDDEN_TAGS.iter().copied().collect();
        forbidden_tags.insert("iframe");

        Self {
            kind: PolicyKind::Strict,
            allowed_tags: BASE_TAGS.iter().copied().collect(),
            allowed_attributes: BASE_ATTRIBUTES.iter().copied().collect(),
            forbidden_tags,
            allowed_style_properties: BTreeSet::new(),
            uri_rule: UriRule::SafeSchemes,
        }
    }

    pub fn rich_embed() -> Self {
        let mut allowed_tags: BTreeSet<_> = BASE_TAGS.iter().copied().collect();
        allowed_tags.insert("iframe");

        Self {
            kind: PolicyKind::RichEmbed,
            allowed_tags,
            allowed_attributes: BASE_ATTRIBUTES
                .iter()
                .chain(EMBED_ATTRIBUTES)
                .copied()
                .collect(),
            forbidden_tags: FORBIDDEN_TAGS.iter().copied().collect(),
            allowed_style_properties: STYLE_PROPERTIES.iter().copied().collect(),
            uri_rule: UriRule::trusted_hosts(),
        }
    }

    pub fn for_kind(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Strict => Self::strict(),
            PolicyKind::RichEmbed => Self::rich_embed(),
        }
    }

    pub fn with_extra_hosts(mut self, hosts: &[String]) -> Self {
        self.uri_rule = self.uri_rule.with_extra_hosts(hosts);
        self
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.allowed_tags.contains(tag) && !self.forbidden_tags.contains(tag)
    }

    pub fn is_forbidden_tag(&self, tag: &str) -> bool {
        self.forbidden_tags.contains(tag)
    }

    pub fn allows_attribute(&self, name: &str) -> bool {
        !is_event_handler(name) && self.allowed_attributes.contains(name)
    }

    /// Elements removed together with everything inside them.
    pub fn drops_content(&self, tag: &str) -> bool {
        self.is_forbidden_tag(tag) || DROP_CONTENT_TAGS.contains(&tag)
    }

    pub fn allows_iframe(&self) -> bool {
        self.allows_tag("iframe")
    }

    pub fn allows_style_property(&self, property: &str) -> bool {
        self.allowed_style_properties.contains(property)
    }
}

/// `onclick`, `onerror`, ... in any casing.
pub fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_policy_has_no_iframe_or_style() {
        let policy = SanitizationPolicy::strict();
        assert!(!policy.allows_iframe());
        assert!(policy.is_forbidden_tag("iframe"));
        assert!(!policy.allows_attribute("style"));
        assert!(policy.allows_attribute("href"));
        assert_eq!(policy.uri_rule, UriRule::SafeSchemes);
    }

    #[test]
    fn rich_policy_allows_embeds() {
        let policy = SanitizationPolicy::rich_embed();
        assert!(policy.allows_iframe());
        assert!(policy.allows_attribute("frameborder"));
        assert!(policy.allows_attribute("style"));
        assert!(policy.allows_style_property("border-radius"));
        assert!(!policy.allows_style_property("position"));
    }

    #[test]
    fn forbidden_tags_never_allowed() {
        for policy in [SanitizationPolicy::strict(), SanitizationPolicy::rich_embed()] {
            for tag in ["script", "style", "object", "embed"] {
                assert!(!policy.allows_tag(tag), "{} allowed under {}", tag, policy.kind);
            }
        }
    }

    #[test]
    fn foreign_content_dropped_with_content() {
        let policy = SanitizationPolicy::rich_embed();
        assert!(policy.drops_content("svg"));
        assert!(policy.drops_content("noscript"));
        assert!(policy.drops_content("script"));
        assert!(!policy.drops_content("iframe"));
        assert!(SanitizationPolicy::strict().drops_content("iframe"));
    }

    #[test]
    fn event_handlers_detected() {
        assert!(is_event_handler("onclick"));
        assert!(is_event_handler("ONERROR"));
        assert!(!is_event_handler("on"));
        assert!(!is_event_handler("alt"));
        assert!(!is_event_handler("é"));
    }

    #[test]
    fn parse_policy_kind() {
        assert_eq!("strict".parse::<PolicyKind>(), Ok(PolicyKind::Strict));
        assert_eq!(" Rich-Embed ".parse::<PolicyKind>(), Ok(PolicyKind::RichEmbed));
        assert!("lenient".parse::<PolicyKind>().is_err());
    }
}
