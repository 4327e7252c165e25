use url::Url;

/// Hosts whose content may be linked or embedded under the rich-embed policy.
/// Subdomains of every entry are trusted as well.
pub const TRUSTED_EMBED_HOSTS: &[&str] = &[
    // video
    "youtube.com",
    "vimeo.com",
    "youtu.be",
    // code playgrounds
    "codepen.io",
    "codesandbox.io",
    "jsfiddle.net",
    "replit.com",
    // source hosting
    "github.com",
    "gist.github.com",
    // documents, drive, maps
    "docs.google.com",
    "drive.google.com",
    "maps.google.com",
    // game storefront
    "store.steampowered.com",
    "steamcommunity.com",
];

/// Streaming and storefront providers whose widgets render without a frame.
pub const BORDERLESS_EMBED_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "steampowered.com",
    "steamcommunity.com",
];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];
const HOSTLESS_SCHEMES: &[&str] = &["mailto", "tel"];

/// Constraint on `href`/`src` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriRule {
    /// `http`, `https`, `mailto`, `tel` or a relative reference.
    SafeSchemes,
    /// `http`/`https` to one of the listed hosts, or `mailto:`/`tel:`.
    TrustedHosts(Vec<String>),
}

impl UriRule {
    pub fn trusted_hosts() -> Self {
        UriRule::TrustedHosts(TRUSTED_EMBED_HOSTS.iter().map(|h| h.to_string()).collect())
    }

    /// Append hosts to a `TrustedHosts` rule. `SafeSchemes` is returned as is.
    pub fn with_extra_hosts(self, extra: &[String]) -> Self {
        match self {
            UriRule::TrustedHosts(mut hosts) => {
                for host in extra {
                    let host = host.trim().trim_start_matches('.').to_ascii_lowercase();
                    if !host.is_empty() && !hosts.contains(&host) {
                        hosts.push(host);
                    }
                }
                UriRule::TrustedHosts(hosts)
            }
            other => other,
        }
    }

    pub fn permits(&self, value: &str) -> bool {
        let compact = compact_uri(value);
        if compact.is_empty() {
            return false;
        }

        match self {
            UriRule::SafeSchemes => match uri_scheme(&compact) {
                Some(scheme) => SAFE_SCHEMES.contains(&scheme.as_str()),
                None => true,
            },
            UriRule::TrustedHosts(hosts) => {
                if let Some(scheme) = uri_scheme(&compact) {
                    if HOSTLESS_SCHEMES.contains(&scheme.as_str()) {
                        return true;
                    }
                }
                web_host(value.trim()).is_some_and(|host| host_matches(&host, hosts))
            }
        }
    }

    /// Schemes an absolute URL may use under this rule.
    pub fn schemes(&self) -> &'static [&'static str] {
        SAFE_SCHEMES
    }

    pub fn allows_relative(&self) -> bool {
        matches!(self, UriRule::SafeSchemes)
    }
}

/// Host of an `http`/`https` URL, lowercased.
pub fn web_host(value: &str) -> Option<String> {
    let url = Url::parse(value).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase())
}

pub fn host_matches<S: AsRef<str>>(host: &str, domains: &[S]) -> bool {
    domains.iter().any(|domain| {
        let domain = domain.as_ref();
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

pub fn is_borderless_embed(src: &str) -> bool {
    web_host(src.trim()).is_some_and(|host| host_matches(&host, BORDERLESS_EMBED_HOSTS))
}

// Browsers ignore embedded whitespace and control characters when reading a
// scheme, so "java\tscript:" must be judged as "javascript:".
fn compact_uri(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect()
}

fn uri_scheme(compact: &str) -> Option<String> {
    let colon = compact.find(':')?;
    let prefix = &compact[..colon];
    if prefix.contains(['/', '?', '#']) {
        return None;
    }
    Some(prefix.to_ascii_lowercase())
}
