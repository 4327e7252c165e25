use crate::models::PolicyKind;
use crate::services::fallback::DEFAULT_MAX_DEPTH;
use crate::services::preview::DEFAULT_EXCERPT_LENGTH;
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub excerpt_max_length: usize,
    /// 0 disables the render cache.
    pub cache_capacity: usize,
    pub primary_enabled: bool,
    pub fallback_max_depth: usize,
    pub extra_embed_hosts: Vec<String>,
    pub default_policy: PolicyKind,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            excerpt_max_length: DEFAULT_EXCERPT_LENGTH,
            cache_capacity: 0,
            primary_enabled: true,
            fallback_max_depth: DEFAULT_MAX_DEPTH,
            extra_embed_hosts: Vec::new(),
            default_policy: PolicyKind::Strict,
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Invalid values are logged and the
    /// default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("EXCERPT_MAX_LENGTH") {
            match parse_positive(&raw) {
                Ok(value) => cfg.excerpt_max_length = value,
                Err(err) => tracing::warn!("Invalid EXCERPT_MAX_LENGTH '{}': {}", raw, err),
            }
        }

        if let Some(raw) = lookup("RENDER_CACHE_CAPACITY") {
            match raw.trim().parse::<usize>() {
                Ok(value) => cfg.cache_capacity = value,
                Err(_) => tracing::warn!("Invalid RENDER_CACHE_CAPACITY '{}'", raw),
            }
        }

        if let Some(raw) = lookup("PRIMARY_SANITIZER_ENABLED") {
            match parse_bool(&raw) {
                Some(value) => cfg.primary_enabled = value,
                None => tracing::warn!("Invalid PRIMARY_SANITIZER_ENABLED '{}'", raw),
            }
        }

        if let Some(raw) = lookup("FALLBACK_MAX_DEPTH") {
            match parse_positive(&raw) {
                Ok(value) => cfg.fallback_max_depth = value,
                Err(err) => tracing::warn!("Invalid FALLBACK_MAX_DEPTH '{}': {}", raw, err),
            }
        }

        if let Some(raw) = lookup("EXTRA_EMBED_HOSTS") {
            cfg.extra_embed_hosts = parse_host_list(&raw);
        }

        if let Some(raw) = lookup("RENDER_DEFAULT_POLICY") {
            match raw.parse::<PolicyKind>() {
                Ok(kind) => cfg.default_policy = kind,
                Err(err) => tracing::warn!("Invalid RENDER_DEFAULT_POLICY: {}", err),
            }
        }

        cfg
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    let value: usize = raw
        .trim()
        .parse()
        .map_err(|_| format!("not a number '{}'", raw.trim()))?;
    if value == 0 {
        return Err("must be > 0".to_string());
    }
    Ok(value)
}

/// "a.com, B.org,,c.net" -> ["a.com", "b.org", "c.net"]
fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|host| host.trim().trim_end_matches('.').to_ascii_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}
