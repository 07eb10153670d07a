//! Wiring of the store, compile workers, renderer, and router into one instance.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::application::compile::{Compiler, CompilerPool, WorkerOptions, spawn_compile_workers};
use crate::application::engine::TemplateEngine;
use crate::application::render::{Renderer, RendererOptions};
use crate::application::router::RequestRouter;
use crate::application::source::TemplateSource;
use crate::cache::ArtifactStore;
use crate::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub workers: WorkerOptions,
    pub renderer: RendererOptions,
    pub reply_timeout: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            workers: WorkerOptions::default(),
            renderer: RendererOptions::default(),
            reply_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&Settings> for ServiceOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            workers: WorkerOptions {
                workers: settings.workers.compiler_workers,
                queue_depth: settings.workers.queue_depth,
                single_flight: settings.workers.single_flight,
            },
            renderer: RendererOptions {
                freshness_check: settings.templates.freshness_check,
                compile_timeout: settings.timeouts.compile,
            },
            reply_timeout: settings.timeouts.reply,
        }
    }
}

impl ServiceOptions {
    pub fn with_compiler_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers.workers = workers;
        self
    }
}

/// A running template service. Each instance owns its own artifact store.
pub struct TemplateService {
    store: Arc<ArtifactStore>,
    router: Arc<RequestRouter>,
    pool: CompilerPool,
}

impl TemplateService {
    /// Start the compile workers and assemble the router. Must be called from
    /// within a tokio runtime.
    pub fn start(
        options: ServiceOptions,
        source: Arc<dyn TemplateSource>,
        engine: Arc<dyn TemplateEngine>,
    ) -> Self {
        let store = Arc::new(ArtifactStore::new());
        let compiler = Arc::new(Compiler::new(
            Arc::clone(&store),
            Arc::clone(&source),
            engine,
        ));
        let pool = spawn_compile_workers(compiler, options.workers);
        let renderer = Arc::new(Renderer::new(
            Arc::clone(&store),
            source,
            pool.handle(),
            options.renderer,
        ));
        let router = Arc::new(RequestRouter::new(
            Arc::clone(&store),
            pool.handle(),
            renderer,
            options.reply_timeout,
        ));

        Self {
            store,
            router,
            pool,
        }
    }

    pub fn router(&self) -> Arc<RequestRouter> {
        Arc::clone(&self.router)
    }

    pub fn store(&self) -> Arc<ArtifactStore> {
        Arc::clone(&self.store)
    }

    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
