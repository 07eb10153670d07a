//! Template source adapters.

mod fs;
mod memory;

pub use fs::FsTemplateSource;
pub use memory::MemoryTemplateSource;
