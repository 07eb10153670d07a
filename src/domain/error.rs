use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::TemplateId;

/// Tagged failure delivered to the caller of a compile or render exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateFailure {
    #[error("template not found: {id}")]
    NotFound { id: TemplateId },
    #[error("failed to compile template {id}: {detail}")]
    CompileFailed { id: TemplateId, detail: String },
    #[error("failed to render template {id}: {detail}")]
    ApplyFailed { id: TemplateId, detail: String },
    #[error("no reply within {waited_ms} ms")]
    Timeout { waited_ms: u64 },
    #[error("unexpected error: {detail}")]
    Unexpected { detail: String },
}

impl TemplateFailure {
    pub fn not_found(id: &TemplateId) -> Self {
        Self::NotFound { id: id.clone() }
    }

    pub fn compile_failed(id: &TemplateId, detail: impl Into<String>) -> Self {
        Self::CompileFailed {
            id: id.clone(),
            detail: detail.into(),
        }
    }

    pub fn apply_failed(id: &TemplateId, detail: impl Into<String>) -> Self {
        Self::ApplyFailed {
            id: id.clone(),
            detail: detail.into(),
        }
    }

    pub fn timeout(waited: std::time::Duration) -> Self {
        Self::Timeout {
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::Unexpected {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            TemplateFailure::NotFound { .. } => FailureKind::NotFound,
            TemplateFailure::CompileFailed { .. } => FailureKind::CompileFailed,
            TemplateFailure::ApplyFailed { .. } => FailureKind::ApplyFailed,
            TemplateFailure::Timeout { .. } => FailureKind::Timeout,
            TemplateFailure::Unexpected { .. } => FailureKind::Unexpected,
        }
    }

    /// Message safe to hand back to a caller. `Unexpected` details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            TemplateFailure::Unexpected { .. } => "unexpected error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Wire tag for [`TemplateFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    CompileFailed,
    ApplyFailed,
    Timeout,
    Unexpected,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::CompileFailed => "compile_failed",
            FailureKind::ApplyFailed => "apply_failed",
            FailureKind::Timeout => "timeout",
            FailureKind::Unexpected => "unexpected",
        }
    }
}

/// Errors reported by a template source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("template source `{id}` does not exist")]
    NotFound { id: TemplateId },
    #[error("failed to read template source `{id}`: {source}")]
    Io {
        id: TemplateId,
        #[source]
        source: std::io::Error,
    },
    #[error("template source `{id}` is not valid UTF-8")]
    Encoding { id: TemplateId },
}

impl SourceError {
    pub fn not_found(id: &TemplateId) -> Self {
        Self::NotFound { id: id.clone() }
    }

    pub fn io(id: &TemplateId, source: std::io::Error) -> Self {
        Self::Io {
            id: id.clone(),
            source,
        }
    }

    pub fn encoding(id: &TemplateId) -> Self {
        Self::Encoding { id: id.clone() }
    }
}

impl From<SourceError> for TemplateFailure {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::NotFound { id } => TemplateFailure::NotFound { id },
            other => TemplateFailure::unexpected(other.to_string()),
        }
    }
}

/// Errors reported by the template engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("{message}")]
    Compile { message: String },
    #[error("{message}")]
    Apply { message: String },
}

impl EngineError {
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile {
            message: message.into(),
        }
    }

    pub fn apply(message: impl Into<String>) -> Self {
        Self::Apply {
            message: message.into(),
        }
    }
}
