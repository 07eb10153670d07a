//! Template source seam: where template text and its modification time come from.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::domain::{SourceError, TemplateId};

/// Template text together with the modification time it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub text: String,
    pub last_modified: OffsetDateTime,
}

#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Read the full source text and its modification time.
    async fn read_source(&self, id: &TemplateId) -> Result<SourceDocument, SourceError>;

    /// Metadata-only lookup used by the freshness check.
    async fn last_modified(&self, id: &TemplateId) -> Result<OffsetDateTime, SourceError>;
}

#[async_trait]
impl<S: TemplateSource + ?Sized> TemplateSource for Arc<S> {
    async fn read_source(&self, id: &TemplateId) -> Result<SourceDocument, SourceError> {
        (**self).read_source(id).await
    }

    async fn last_modified(&self, id: &TemplateId) -> Result<OffsetDateTime, SourceError> {
        (**self).last_modified(id).await
    }
}
