pub mod outcome;
pub mod policy;

pub use outcome::RenderOutcome;
pub use policy::{PolicyKind, SanitizationPolicy};
