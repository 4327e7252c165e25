pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use config::RenderConfig;
pub use error::{AppError, AppResult};
pub use models::{PolicyKind, RenderOutcome, SanitizationPolicy};
pub use services::content::{
    apply_embed_fixups, attach_embed_fixups, escape_for_display, excerpt, render_content,
};
pub use services::{requires_fallback_sanitizer, ContentPipeline, HtmlSanitizer, RenderCache};
pub use utils::dom::Fragment;
