use std::sync::Arc;

use time::OffsetDateTime;

use crate::cache::CacheEntry;

/// What the renderer learned about the template source before deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStamp {
    /// Source exists and was last modified at this instant.
    Modified(OffsetDateTime),
    /// Source reported as absent.
    Removed,
    /// Not consulted (freshness check disabled) or the lookup failed.
    Unknown,
}

#[derive(Debug, Clone)]
pub enum Freshness {
    Fresh(Arc<CacheEntry>),
    Stale(Arc<CacheEntry>),
    Missing,
}

/// Decide whether `entry` can serve a render given what the source reported.
///
/// Only a source modified strictly after the entry's timestamp makes it stale.
/// An absent source or one that could not be inspected leaves a cached entry
/// fresh: serving the last good artifact beats failing the render.
pub fn assess(entry: Option<Arc<CacheEntry>>, stamp: SourceStamp) -> Freshness {
    match (entry, stamp) {
        (None, _) => Freshness::Missing,
        (Some(entry), SourceStamp::Modified(modified)) if modified > entry.compiled_at() => {
            Freshness::Stale(entry)
        }
        (Some(entry), _) => Freshness::Fresh(entry),
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::application::engine::{CompiledTemplate, TemplateArtifact};
    use crate::domain::{EngineError, RenderData};

    struct Blank;

    impl TemplateArtifact for Blank {
        fn apply(&self, _data: &RenderData) -> Result<String, EngineError> {
            Ok(String::new())
        }
    }

    fn t0() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::days(20_000)
    }

    fn entry_at(at: OffsetDateTime) -> Option<Arc<CacheEntry>> {
        Some(Arc::new(CacheEntry::new(CompiledTemplate::new(Blank), at)))
    }

    #[test]
    fn missing_entry_is_missing_whatever_the_source_says() {
        for stamp in [
            SourceStamp::Modified(t0()),
            SourceStamp::Removed,
            SourceStamp::Unknown,
        ] {
            assert!(matches!(assess(None, stamp), Freshness::Missing));
        }
    }

    #[test]
    fn equal_timestamp_is_fresh() {
        let freshness = assess(entry_at(t0()), SourceStamp::Modified(t0()));
        assert!(matches!(freshness, Freshness::Fresh(_)));
    }

    #[test]
    fn older_source_is_fresh() {
        let freshness = assess(
            entry_at(t0()),
            SourceStamp::Modified(t0() - Duration::seconds(30)),
        );
        assert!(matches!(freshness, Freshness::Fresh(_)));
    }

    #[test]
    fn strictly_newer_source_is_stale() {
        let freshness = assess(
            entry_at(t0()),
            SourceStamp::Modified(t0() + Duration::milliseconds(1)),
        );
        assert!(matches!(freshness, Freshness::Stale(_)));
    }

    #[test]
    fn removed_or_unknown_source_keeps_entry_fresh() {
        assert!(matches!(
            assess(entry_at(t0()), SourceStamp::Removed),
            Freshness::Fresh(_)
        ));
        assert!(matches!(
            assess(entry_at(t0()), SourceStamp::Unknown),
            Freshness::Fresh(_)
        ));
    }
}
