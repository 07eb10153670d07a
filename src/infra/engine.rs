//! Handlebars implementation of the template engine seam.

use handlebars::Handlebars;

use crate::application::engine::{CompiledTemplate, TemplateArtifact, TemplateEngine};
use crate::domain::{EngineError, RenderData, TemplateId};

#[derive(Debug, Clone, Copy, Default)]
pub struct HandlebarsEngine {
    strict: bool,
}

impl HandlebarsEngine {
    /// With `strict` set, referencing a missing variable fails the render
    /// instead of producing an empty string.
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn compile(&self, id: &TemplateId, source: &str) -> Result<CompiledTemplate, EngineError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(self.strict);
        registry
            .register_template_string(id.as_str(), source)
            .map_err(|err| EngineError::compile(err.to_string()))?;

        Ok(CompiledTemplate::new(HandlebarsArtifact {
            name: id.as_str().to_owned(),
            registry,
        }))
    }
}

/// One parsed template in a registry of its own, so artifacts never share state.
struct HandlebarsArtifact {
    name: String,
    registry: Handlebars<'static>,
}

impl TemplateArtifact for HandlebarsArtifact {
    fn apply(&self, data: &RenderData) -> Result<String, EngineError> {
        self.registry
            .render(&self.name, data)
            .map_err(|err| EngineError::apply(err.to_string()))
    }
}
