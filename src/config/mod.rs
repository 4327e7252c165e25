pub mod render;

pub use render::RenderConfig;
