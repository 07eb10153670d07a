//! Render role: freshness decision, compile delegation, and apply.

mod freshness;
mod renderer;

pub use freshness::{Freshness, SourceStamp, assess};
pub use renderer::{Renderer, RendererOptions};
