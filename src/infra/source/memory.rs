use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::source::{SourceDocument, TemplateSource};
use crate::cache::RecoverLock;
use crate::domain::{SourceError, TemplateId};

const SOURCE: &str = "infra::source::memory";

/// Template source backed by a map, with caller-controlled timestamps.
///
/// Useful for embedding templates in a binary and for tests that need to move
/// a template's modification time deterministically.
#[derive(Default)]
pub struct MemoryTemplateSource {
    documents: RwLock<HashMap<TemplateId, SourceDocument>>,
    reads: AtomicUsize,
    lookups: AtomicUsize,
}

impl MemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template.
    pub fn insert(
        &self,
        id: impl Into<TemplateId>,
        text: impl Into<String>,
        last_modified: OffsetDateTime,
    ) {
        let document = SourceDocument {
            text: text.into(),
            last_modified,
        };
        self.documents
            .write_or_recover(SOURCE, "insert")
            .insert(id.into(), document);
    }

    pub fn remove(&self, id: &TemplateId) -> Option<SourceDocument> {
        self.documents.write_or_recover(SOURCE, "remove").remove(id)
    }

    /// Number of `read_source` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `last_modified` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn document(&self, id: &TemplateId) -> Result<SourceDocument, SourceError> {
        self.documents
            .read_or_recover(SOURCE, "get")
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::not_found(id))
    }
}

#[async_trait]
impl TemplateSource for MemoryTemplateSource {
    async fn read_source(&self, id: &TemplateId) -> Result<SourceDocument, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.document(id)
    }

    async fn last_modified(&self, id: &TemplateId) -> Result<OffsetDateTime, SourceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.document(id).map(|document| document.last_modified)
    }
}
