use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::application::compile::CompilerHandle;
use crate::application::source::TemplateSource;
use crate::cache::{ArtifactStore, CacheEntry};
use crate::domain::{RenderData, SourceError, TemplateFailure, TemplateId};

use super::freshness::{Freshness, SourceStamp, assess};

const METRIC_RENDER_TOTAL: &str = "sagoma_render_total";
const METRIC_RENDER_HIT_TOTAL: &str = "sagoma_render_cache_hit_total";
const METRIC_RENDER_MISS_TOTAL: &str = "sagoma_render_cache_miss_total";
const METRIC_RENDER_STALE_TOTAL: &str = "sagoma_render_cache_stale_total";
const METRIC_RENDER_FAILED_TOTAL: &str = "sagoma_render_failed_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererOptions {
    /// Compare the source timestamp with the cached entry on every render.
    pub freshness_check: bool,
    /// Upper bound on waiting for the compiler role.
    pub compile_timeout: Duration,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            freshness_check: true,
            compile_timeout: Duration::from_secs(30),
        }
    }
}

/// Serves renders from the artifact store, asking the compiler role for a new
/// artifact when the cached one is missing or older than its source.
pub struct Renderer {
    store: Arc<ArtifactStore>,
    source: Arc<dyn TemplateSource>,
    compiler: CompilerHandle,
    options: RendererOptions,
}

impl Renderer {
    pub fn new(
        store: Arc<ArtifactStore>,
        source: Arc<dyn TemplateSource>,
        compiler: CompilerHandle,
        options: RendererOptions,
    ) -> Self {
        Self {
            store,
            source,
            compiler,
            options,
        }
    }

    #[instrument(skip(self, data), fields(template_id = %id))]
    pub async fn render(&self, id: &TemplateId, data: RenderData) -> Result<String, TemplateFailure> {
        counter!(METRIC_RENDER_TOTAL).increment(1);

        let result = self.render_inner(id, data).await;
        if let Err(failure) = &result {
            counter!(METRIC_RENDER_FAILED_TOTAL, "kind" => failure.kind().as_str()).increment(1);
        }
        result
    }

    async fn render_inner(
        &self,
        id: &TemplateId,
        data: RenderData,
    ) -> Result<String, TemplateFailure> {
        let cached = self.store.get(id);
        let stamp = self.source_stamp(id).await;

        if cached.is_none() && stamp == SourceStamp::Removed {
            counter!(METRIC_RENDER_MISS_TOTAL).increment(1);
            return Err(TemplateFailure::not_found(id));
        }

        let entry = match assess(cached, stamp) {
            Freshness::Fresh(entry) => {
                counter!(METRIC_RENDER_HIT_TOTAL).increment(1);
                entry
            }
            Freshness::Stale(entry) => {
                counter!(METRIC_RENDER_STALE_TOTAL).increment(1);
                info!(
                    target = "sagoma::render",
                    template_id = %id,
                    compiled_at = %entry.compiled_at(),
                    "Template is out of date and will be recompiled"
                );
                self.recompile(id).await?
            }
            Freshness::Missing => {
                counter!(METRIC_RENDER_MISS_TOTAL).increment(1);
                debug!(template_id = %id, "Template not cached; compiling");
                self.recompile(id).await?
            }
        };

        apply(id, entry, data).await
    }

    async fn source_stamp(&self, id: &TemplateId) -> SourceStamp {
        if !self.options.freshness_check {
            return SourceStamp::Unknown;
        }

        match self.source.last_modified(id).await {
            Ok(modified) => SourceStamp::Modified(modified),
            Err(SourceError::NotFound { .. }) => SourceStamp::Removed,
            Err(err) => {
                warn!(
                    target = "sagoma::render",
                    template_id = %id,
                    error = %err,
                    "Could not read template timestamp"
                );
                SourceStamp::Unknown
            }
        }
    }

    async fn recompile(&self, id: &TemplateId) -> Result<Arc<CacheEntry>, TemplateFailure> {
        let limit = self.options.compile_timeout;
        let compiled = match tokio::time::timeout(limit, self.compiler.request(id)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                warn!(
                    target = "sagoma::render",
                    template_id = %id,
                    waited_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    "Gave up waiting for compile"
                );
                return Err(TemplateFailure::timeout(limit));
            }
        };

        // A flush between install and this read leaves only the returned entry.
        Ok(self.store.get(id).unwrap_or(compiled))
    }
}

async fn apply(
    id: &TemplateId,
    entry: Arc<CacheEntry>,
    data: RenderData,
) -> Result<String, TemplateFailure> {
    tokio::task::spawn_blocking(move || entry.compiled().apply(&data))
        .await
        .map_err(|err| TemplateFailure::unexpected(format!("apply task for `{id}` did not finish: {err}")))?
        .map_err(|err| TemplateFailure::apply_failed(id, err.to_string()))
}
