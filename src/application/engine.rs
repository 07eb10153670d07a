//! Template engine seam.
//!
//! The engine is a pair of pure functions: `compile` turns source text into an
//! artifact, and the artifact's `apply` turns render data into output. Neither
//! step touches the artifact store.

use std::fmt;
use std::sync::Arc;

use crate::domain::{EngineError, RenderData, TemplateId};

/// An engine-produced artifact that can be applied to data.
///
/// Implementations must not mutate themselves in `apply`; a single artifact is
/// shared by every concurrent render of its template.
pub trait TemplateArtifact: Send + Sync {
    fn apply(&self, data: &RenderData) -> Result<String, EngineError>;
}

/// Immutable, cheaply clonable handle to a compiled template.
#[derive(Clone)]
pub struct CompiledTemplate {
    inner: Arc<dyn TemplateArtifact>,
}

impl CompiledTemplate {
    pub fn new(artifact: impl TemplateArtifact + 'static) -> Self {
        Self {
            inner: Arc::new(artifact),
        }
    }

    pub fn apply(&self, data: &RenderData) -> Result<String, EngineError> {
        self.inner.apply(data)
    }

    /// True when both handles point at the same artifact.
    pub fn same_artifact(&self, other: &CompiledTemplate) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate").finish_non_exhaustive()
    }
}

/// Compiles template source text. Implementations must be deterministic:
/// the same source always compiles to an equivalent artifact or the same error.
pub trait TemplateEngine: Send + Sync {
    fn compile(&self, id: &TemplateId, source: &str) -> Result<CompiledTemplate, EngineError>;
}

impl<E: TemplateEngine + ?Sized> TemplateEngine for Arc<E> {
    fn compile(&self, id: &TemplateId, source: &str) -> Result<CompiledTemplate, EngineError> {
        (**self).compile(id, source)
    }
}
