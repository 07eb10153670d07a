#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sagoma::application::engine::{CompiledTemplate, TemplateEngine};
use sagoma::application::service::{ServiceOptions, TemplateService};
use sagoma::application::source::{SourceDocument, TemplateSource};
use sagoma::domain::{EngineError, RenderData, SourceError, TemplateId};
use sagoma::infra::engine::HandlebarsEngine;
use sagoma::infra::source::MemoryTemplateSource;
use serde_json::Value;
use time::OffsetDateTime;

/// Handlebars engine that counts compiles and can be slowed down.
#[derive(Default)]
pub struct CountingEngine {
    inner: HandlebarsEngine,
    compiles: AtomicUsize,
    delay_ms: AtomicU64,
}

impl CountingEngine {
    pub fn strict() -> Self {
        Self {
            inner: HandlebarsEngine::new(true),
            ..Default::default()
        }
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }
}

impl TemplateEngine for CountingEngine {
    fn compile(&self, id: &TemplateId, source: &str) -> Result<CompiledTemplate, EngineError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        self.inner.compile(id, source)
    }
}

pub struct Harness {
    pub service: TemplateService,
    pub source: Arc<MemoryTemplateSource>,
    pub engine: Arc<CountingEngine>,
}

impl Harness {
    pub fn start(options: ServiceOptions) -> Self {
        Self::with_engine(options, CountingEngine::default())
    }

    pub fn with_engine(options: ServiceOptions, engine: CountingEngine) -> Self {
        let source = Arc::new(MemoryTemplateSource::new());
        let engine = Arc::new(engine);
        let service = TemplateService::start(options, source.clone(), engine.clone());
        Self {
            service,
            source,
            engine,
        }
    }
}

/// Memory source whose reads can be switched to fail with an I/O error.
#[derive(Default)]
pub struct UnreliableSource {
    pub inner: MemoryTemplateSource,
    failing: AtomicBool,
}

impl UnreliableSource {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, id: &TemplateId) -> Result<(), SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::io(
                id,
                std::io::Error::other("storage unavailable"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateSource for UnreliableSource {
    async fn read_source(&self, id: &TemplateId) -> Result<SourceDocument, SourceError> {
        self.check(id)?;
        self.inner.read_source(id).await
    }

    async fn last_modified(&self, id: &TemplateId) -> Result<OffsetDateTime, SourceError> {
        self.check(id)?;
        self.inner.last_modified(id).await
    }
}

/// Fixed, second-aligned instant used as the first source timestamp.
pub fn t0() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000)
}

pub fn t1() -> OffsetDateTime {
    t0() + time::Duration::seconds(1)
}

pub fn data(value: Value) -> RenderData {
    match value {
        Value::Object(map) => map,
        other => panic!("render data must be an object, got {other}"),
    }
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn eventually(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
