pub mod cache;
pub mod content;
pub mod embed;
pub mod fallback;
pub mod preview;
pub mod sanitizer;

pub use cache::RenderCache;
pub use content::{requires_fallback_sanitizer, ContentPipeline};
pub use embed::{EmbedAttributeRestorer, EmbedAttributeSnapshot};
pub use fallback::FallbackSanitizer;
pub use preview::ContentPreviewExtractor;
pub use sanitizer::{AmmoniaSanitizer, HtmlSanitizer};
