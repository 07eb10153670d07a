//! Domain layer types and invariants.

pub mod error;
pub mod types;

pub use error::{EngineError, FailureKind, SourceError, TemplateFailure};
pub use types::{RenderData, TemplateId};
