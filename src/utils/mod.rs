pub mod dom;
pub mod escape;
pub mod markdown;
pub mod uri;

pub use escape::escape_html;
pub use markdown::MarkdownConverter;
pub use uri::UriRule;
