use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, instrument, warn};

use crate::application::engine::TemplateEngine;
use crate::application::source::{SourceDocument, TemplateSource};
use crate::cache::{ArtifactStore, CacheEntry};
use crate::domain::{TemplateFailure, TemplateId};

const METRIC_COMPILE_TOTAL: &str = "sagoma_compile_total";
const METRIC_COMPILE_FAILED_TOTAL: &str = "sagoma_compile_failed_total";
const METRIC_COMPILE_MS: &str = "sagoma_compile_ms";

/// Reads a template, compiles it, and publishes the result into the store.
///
/// A failed compile never touches the store, so the last good artifact stays
/// available to renders that still consider it fresh.
pub struct Compiler {
    store: Arc<ArtifactStore>,
    source: Arc<dyn TemplateSource>,
    engine: Arc<dyn TemplateEngine>,
}

impl Compiler {
    pub fn new(
        store: Arc<ArtifactStore>,
        source: Arc<dyn TemplateSource>,
        engine: Arc<dyn TemplateEngine>,
    ) -> Self {
        Self {
            store,
            source,
            engine,
        }
    }

    /// Compile `id` and install it. Returns the entry held by the store afterwards,
    /// which is the new one unless a compile of a later source beat it there.
    #[instrument(skip(self), fields(template_id = %id))]
    pub async fn compile_and_store(
        &self,
        id: &TemplateId,
    ) -> Result<Arc<CacheEntry>, TemplateFailure> {
        let started_at = Instant::now();
        counter!(METRIC_COMPILE_TOTAL).increment(1);

        let result = self.compile(id).await;
        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_COMPILE_MS).record(elapsed_ms);

        match &result {
            Ok(entry) => info!(
                target = "sagoma::compile",
                template_id = %id,
                compiled_at = %entry.compiled_at(),
                elapsed_ms,
                "Template compiled"
            ),
            Err(failure) => {
                counter!(METRIC_COMPILE_FAILED_TOTAL, "kind" => failure.kind().as_str())
                    .increment(1);
                warn!(
                    target = "sagoma::compile",
                    template_id = %id,
                    kind = failure.kind().as_str(),
                    error = %failure,
                    elapsed_ms,
                    "Template compile failed"
                );
            }
        }

        result
    }

    async fn compile(&self, id: &TemplateId) -> Result<Arc<CacheEntry>, TemplateFailure> {
        let SourceDocument {
            text,
            last_modified,
        } = self.source.read_source(id).await?;

        let engine = Arc::clone(&self.engine);
        let task_id = id.clone();
        let compiled = tokio::task::spawn_blocking(move || engine.compile(&task_id, &text))
            .await
            .map_err(|err| {
                TemplateFailure::unexpected(format!("compile task for `{id}` did not finish: {err}"))
            })?
            .map_err(|err| TemplateFailure::compile_failed(id, err.to_string()))?;

        Ok(self
            .store
            .put_if_newer(id.clone(), CacheEntry::new(compiled, last_modified)))
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::*;
    use crate::domain::{FailureKind, RenderData};
    use crate::infra::engine::HandlebarsEngine;
    use crate::infra::source::MemoryTemplateSource;

    fn t0() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::days(20_000)
    }

    fn compiler_with(source: Arc<MemoryTemplateSource>) -> (Compiler, Arc<ArtifactStore>) {
        let store = Arc::new(ArtifactStore::new());
        let compiler = Compiler::new(
            Arc::clone(&store),
            source,
            Arc::new(HandlebarsEngine::default()),
        );
        (compiler, store)
    }

    #[tokio::test]
    async fn successful_compile_installs_entry_with_source_timestamp() {
        let source = Arc::new(MemoryTemplateSource::new());
        source.insert("hello.hbs", "Hello, {{name}}!", t0());
        let (compiler, store) = compiler_with(source);
        let id = TemplateId::new("hello.hbs");

        let entry = compiler.compile_and_store(&id).await.expect("compiled");

        assert_eq!(entry.compiled_at(), t0());
        let cached = store.get(&id).expect("entry in store");
        let mut data = RenderData::new();
        data.insert("name".into(), "world".into());
        assert_eq!(
            cached.compiled().apply(&data).expect("apply"),
            "Hello, world!"
        );
    }

    #[tokio::test]
    async fn missing_source_is_not_found() {
        let (compiler, store) = compiler_with(Arc::new(MemoryTemplateSource::new()));
        let id = TemplateId::new("absent.hbs");

        let failure = compiler
            .compile_and_store(&id)
            .await
            .expect_err("missing source");

        assert_eq!(failure, TemplateFailure::not_found(&id));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_compile_keeps_last_good_entry() {
        let source = Arc::new(MemoryTemplateSource::new());
        source.insert("page.hbs", "Hello, {{name}}!", t0());
        let (compiler, store) = compiler_with(Arc::clone(&source));
        let id = TemplateId::new("page.hbs");

        let good = compiler.compile_and_store(&id).await.expect("compiled");

        source.insert(
            "page.hbs",
            "{{#if name}}Hello{{/each}}",
            t0() + Duration::seconds(1),
        );
        let failure = compiler
            .compile_and_store(&id)
            .await
            .expect_err("broken template");
        assert_eq!(failure.kind(), FailureKind::CompileFailed);

        let cached = store.get(&id).expect("last good entry kept");
        assert!(cached.compiled().same_artifact(good.compiled()));
        assert_eq!(cached.compiled_at(), t0());
    }
}
