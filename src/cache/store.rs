//! Compiled artifact storage.
//!
//! A map from template id to an immutable [`CacheEntry`]. Entries are never
//! edited in place: a refresh swaps in a new `Arc`, so a reader holding the old
//! entry keeps a consistent snapshot while the store moves on.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use time::OffsetDateTime;
use tracing::{debug, info};

use crate::application::engine::CompiledTemplate;
use crate::domain::TemplateId;

use super::lock::RecoverLock;

const SOURCE: &str = "cache::store";

/// A compiled template and the source timestamp it was compiled from.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    compiled: CompiledTemplate,
    compiled_at: OffsetDateTime,
}

impl CacheEntry {
    pub fn new(compiled: CompiledTemplate, compiled_at: OffsetDateTime) -> Self {
        Self {
            compiled,
            compiled_at,
        }
    }

    pub fn compiled(&self) -> &CompiledTemplate {
        &self.compiled
    }

    /// Modification time of the source this entry was compiled from.
    pub fn compiled_at(&self) -> OffsetDateTime {
        self.compiled_at
    }
}

/// Process-local store of compiled templates.
///
/// Each operation takes the lock for a single map access; nothing holds it
/// across a compile or an await.
#[derive(Default)]
pub struct ArtifactStore {
    entries: RwLock<HashMap<TemplateId, Arc<CacheEntry>>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &TemplateId) -> Option<Arc<CacheEntry>> {
        self.entries.read_or_recover(SOURCE, "get").get(id).cloned()
    }

    /// Unconditional replace; the last writer wins. Returns the displaced entry.
    pub fn put(&self, id: TemplateId, entry: CacheEntry) -> Option<Arc<CacheEntry>> {
        self.entries
            .write_or_recover(SOURCE, "put")
            .insert(id, Arc::new(entry))
    }

    /// Install `entry` unless the current entry was compiled from a strictly
    /// later source. Returns whichever entry is in the store afterwards.
    pub fn put_if_newer(&self, id: TemplateId, entry: CacheEntry) -> Arc<CacheEntry> {
        let mut entries = self.entries.write_or_recover(SOURCE, "put_if_newer");
        if let Some(current) = entries.get(&id)
            && current.compiled_at > entry.compiled_at
        {
            debug!(
                template_id = %id,
                current = %current.compiled_at,
                rejected = %entry.compiled_at,
                "Kept newer cache entry"
            );
            return Arc::clone(current);
        }

        let entry = Arc::new(entry);
        entries.insert(id, Arc::clone(&entry));
        entry
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.entries.write_or_recover(SOURCE, "clear");
            let removed = entries.len();
            entries.clear();
            removed
        };
        info!(removed, "Artifact store cleared");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read_or_recover(SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cached ids, sorted.
    pub fn ids(&self) -> Vec<TemplateId> {
        let mut ids: Vec<TemplateId> = self
            .entries
            .read_or_recover(SOURCE, "ids")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
