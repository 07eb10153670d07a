//! Identifiers and small value types shared across layers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key naming a template's source location, e.g. `templates/hello.hbs`.
///
/// It is the only cache key: two requests naming the same location share one
/// compiled artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TemplateId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for TemplateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Render data handed to a compiled template.
pub type RenderData = serde_json::Map<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_id_serializes_as_plain_string() {
        let id = TemplateId::new("templates/hello.hbs");
        let encoded = serde_json::to_string(&id).expect("serialize id");
        assert_eq!(encoded, "\"templates/hello.hbs\"");

        let decoded: TemplateId = serde_json::from_str(&encoded).expect("deserialize id");
        assert_eq!(decoded, id);
    }
}
