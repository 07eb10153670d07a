//! Compiled template cache.
//!
//! Holds one [`CacheEntry`] per template id. Entries appear only after a
//! successful compile, are swapped wholesale on recompile, and leave only when
//! the whole store is flushed. There is no TTL and no capacity eviction; the
//! renderer's freshness check against the source timestamp is the only
//! invalidation path.

mod lock;
mod store;

pub(crate) use lock::RecoverLock;
pub use store::{ArtifactStore, CacheEntry};
