use crate::config::render::RenderConfig;
use crate::error::{AppError, AppResult};
use crate::models::{PolicyKind, RenderOutcome, SanitizationPolicy};
use crate::services::cache::RenderCache;
use crate::services::embed::EmbedAttributeRestorer;
use crate::services::fallback::FallbackSanitizer;
use crate::services::preview::ContentPreviewExtractor;
use crate::services::sanitizer::{AmmoniaSanitizer, HtmlSanitizer};
use crate::utils::escape::escape_html;
use crate::utils::markdown::MarkdownConverter;
use markup5ever_rcdom::Handle;
use regex::Regex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

fn steam_host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)steampowered\.com").expect("valid steam regex"))
}

fn sized_iframe_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<iframe\b[^>]*\s(?:width|height)\s*=\s*["']?\d"#)
            .expect("valid sized iframe regex")
    })
}

/// Content the primary sanitizer is known to mangle: storefront widgets and
/// iframes with explicit pixel sizing. Such input goes straight to the
/// fallback sanitizer.
pub fn requires_fallback_sanitizer(raw_html: &str) -> bool {
    steam_host_re().is_match(raw_html) || sized_iframe_re().is_match(raw_html)
}

/// Markdown conversion, the sanitizer chain, embed fixups and excerpts,
/// wired together with one configuration.
pub struct ContentPipeline {
    converter: MarkdownConverter,
    primary: Option<Box<dyn HtmlSanitizer>>,
    fallback: Box<dyn HtmlSanitizer>,
    strict: SanitizationPolicy,
    rich_embed: SanitizationPolicy,
    restorer: EmbedAttributeRestorer,
    cache: Option<RenderCache>,
    preview: ContentPreviewExtractor,
}

impl Default for ContentPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentPipeline {
    pub fn new() -> Self {
        let rich_embed = SanitizationPolicy::rich_embed();
        Self {
            converter: MarkdownConverter::new(),
            primary: Some(Box::new(AmmoniaSanitizer::new())),
            fallback: Box::new(FallbackSanitizer::new()),
            strict: SanitizationPolicy::strict(),
            restorer: EmbedAttributeRestorer::new(rich_embed.clone()),
            rich_embed,
            cache: None,
            preview: ContentPreviewExtractor::default(),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        let mut pipeline = Self::new()
            .with_fallback(FallbackSanitizer::with_max_depth(config.fallback_max_depth))
            .with_extra_hosts(&config.extra_embed_hosts)
            .with_excerpt_length(config.excerpt_max_length);

        if !config.primary_enabled {
            tracing::warn!("Primary sanitizer disabled, using fallback only");
            pipeline = pipeline.without_primary();
        }
        if config.cache_capacity > 0 {
            pipeline = pipeline.with_cache(RenderCache::new(config.cache_capacity));
        }
        pipeline
    }

    pub fn with_primary(mut self, sanitizer: impl HtmlSanitizer + 'static) -> Self {
        self.primary = Some(Box::new(sanitizer));
        self
    }

    pub fn without_primary(mut self) -> Self {
        self.primary = None;
        self
    }

    pub fn with_fallback(mut self, sanitizer: impl HtmlSanitizer + 'static) -> Self {
        self.fallback = Box::new(sanitizer);
        self
    }

    pub fn with_cache(mut self, cache: RenderCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Trust additional embed hosts under the rich-embed policy.
    pub fn with_extra_hosts(mut self, hosts: &[String]) -> Self {
        if hosts.is_empty() {
            return self;
        }
        self.rich_embed = self.rich_embed.with_extra_hosts(hosts);
        self.restorer = EmbedAttributeRestorer::new(self.rich_embed.clone());
        self
    }

    pub fn with_excerpt_length(mut self, max_length: usize) -> Self {
        self.preview = ContentPreviewExtractor::new(max_length);
        self
    }

    pub fn policy(&self, kind: PolicyKind) -> &SanitizationPolicy {
        match kind {
            PolicyKind::Strict => &self.strict,
            PolicyKind::RichEmbed => &self.rich_embed,
        }
    }

    pub fn cache(&self) -> Option<&RenderCache> {
        self.cache.as_ref()
    }

    /// Markdown or HTML in, sanitized HTML out.
    pub fn render_content(&self, raw: &str, kind: PolicyKind) -> RenderOutcome {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(kind, raw)) {
            tracing::debug!(policy = %kind, "render cache hit");
            return hit;
        }

        let raw_html = self.converter.to_raw_html(raw);
        let outcome = self.run_chain(&raw_html, self.policy(kind), raw);

        if let Some(cache) = &self.cache {
            cache.set(kind, raw, &outcome);
        }
        outcome
    }

    /// Sanitize HTML that has already been produced, skipping conversion.
    pub fn sanitize_html(&self, raw_html: &str, kind: PolicyKind) -> RenderOutcome {
        self.run_chain(raw_html, self.policy(kind), raw_html)
    }

    /// Plain-text preview of `raw`, cut at `max_length` characters or the
    /// configured length.
    pub fn excerpt(&self, raw: &str, max_length: Option<usize>) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let extractor = max_length
            .map(ContentPreviewExtractor::new)
            .unwrap_or(self.preview);
        extractor.extract(self.render_content(raw, PolicyKind::Strict).html())
    }

    pub fn escape_for_display(&self, text: &str) -> String {
        escape_html(text)
    }

    /// Re-apply iframe sizing and frame styling to a committed fragment.
    pub fn attach_embed_fixups(&self, root: &Handle, original_raw: &str) {
        self.restorer.restore(root, original_raw);
    }

    /// String form of [`Self::attach_embed_fixups`] for server-side rendering.
    /// Returns the input unchanged if it cannot be re-serialized.
    pub fn apply_embed_fixups(&self, sanitized_html: &str, original_raw: &str) -> String {
        match self.restorer.restore_html(sanitized_html, original_raw) {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!("Embed fixups skipped: {}", e);
                sanitized_html.to_string()
            }
        }
    }

    /// `[primary, fallback]`, or `[fallback, primary]` for content the primary
    /// is known to mangle, so the primary is still tried before failing open.
    fn chain(&self, raw_html: &str) -> Vec<&dyn HtmlSanitizer> {
        let mut chain: Vec<&dyn HtmlSanitizer> = Vec::with_capacity(2);
        let primary = self.primary.as_deref();
        if requires_fallback_sanitizer(raw_html) {
            tracing::debug!("Content requires fallback sanitizer, trying it first");
            chain.push(self.fallback.as_ref());
            chain.extend(primary);
        } else {
            chain.extend(primary);
            chain.push(self.fallback.as_ref());
        }
        chain
    }

    fn run_chain(
        &self,
        raw_html: &str,
        policy: &SanitizationPolicy,
        original_raw: &str,
    ) -> RenderOutcome {
        for sanitizer in self.chain(raw_html) {
            match run_strategy(sanitizer, raw_html, policy) {
                Ok(html) => {
                    return RenderOutcome::Sanitized {
                        html,
                        sanitizer: sanitizer.name(),
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        sanitizer = sanitizer.name(),
                        policy = %policy.kind,
                        "Sanitizer failed, trying next: {}",
                        e
                    );
                }
            }
        }

        tracing::error!(
            policy = %policy.kind,
            "All sanitizers failed, returning content unsanitized"
        );
        RenderOutcome::UnsanitizedFallback {
            html: original_raw.to_string(),
        }
    }
}

fn run_strategy(
    sanitizer: &dyn HtmlSanitizer,
    raw_html: &str,
    policy: &SanitizationPolicy,
) -> AppResult<String> {
    panic::catch_unwind(AssertUnwindSafe(|| sanitizer.sanitize(raw_html, policy)))
        .unwrap_or_else(|payload| Err(AppError::from_panic(sanitizer.name(), payload)))
}

fn default_pipeline() -> &'static ContentPipeline {
    static PIPELINE: OnceLock<ContentPipeline> = OnceLock::new();
    PIPELINE.get_or_init(ContentPipeline::new)
}

pub fn render_content(raw: &str, kind: PolicyKind) -> RenderOutcome {
    default_pipeline().render_content(raw, kind)
}

pub fn escape_for_display(text: &str) -> String {
    escape_html(text)
}

pub fn excerpt(raw: &str, max_length: Option<usize>) -> String {
    default_pipeline().excerpt(raw, max_length)
}

pub fn attach_embed_fixups(root: &Handle, original_raw: &str) {
    default_pipeline().attach_embed_fixups(root, original_raw);
}

pub fn apply_embed_fixups(sanitized_html: &str, original_raw: &str) -> String {
    default_pipeline().apply_embed_fixups(sanitized_html, original_raw)
}
