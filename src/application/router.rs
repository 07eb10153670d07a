//! Boundary between callers and the compile/render roles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::application::compile::CompilerHandle;
use crate::application::messages::{
    CompileReply, CompileRequest, FlushReply, FlushRequest, RenderReply, RenderRequest, Reply,
    Request,
};
use crate::application::render::Renderer;
use crate::cache::ArtifactStore;
use crate::domain::TemplateFailure;

const METRIC_CACHE_FLUSH_TOTAL: &str = "sagoma_cache_flush_total";
const METRIC_REPLY_TIMEOUT_TOTAL: &str = "sagoma_reply_timeout_total";

/// Turns compile, render, and flush requests into replies.
///
/// Compile and render run as their own tasks. The caller waits at most the
/// reply timeout; past that it receives a `timeout` reply while the task keeps
/// going and its result is discarded.
pub struct RequestRouter {
    store: Arc<ArtifactStore>,
    compiler: CompilerHandle,
    renderer: Arc<Renderer>,
    reply_timeout: Duration,
}

impl RequestRouter {
    pub fn new(
        store: Arc<ArtifactStore>,
        compiler: CompilerHandle,
        renderer: Arc<Renderer>,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            store,
            compiler,
            renderer,
            reply_timeout,
        }
    }

    pub async fn compile(&self, request: CompileRequest) -> CompileReply {
        let span = info_span!(
            "compile",
            request_id = %Uuid::new_v4(),
            template_id = %request.template_id
        );

        async {
            let compiler = self.compiler.clone();
            let id = request.template_id.clone();
            let outcome = self
                .exchange("compile", async move { compiler.request(&id).await })
                .await;

            match outcome {
                Ok(_) => CompileReply::ok(&request.template_id),
                Err(failure) => CompileReply::failed(&failure),
            }
        }
        .instrument(span)
        .await
    }

    pub async fn render(&self, request: RenderRequest) -> RenderReply {
        let span = info_span!(
            "render",
            request_id = %Uuid::new_v4(),
            template_id = %request.template_id
        );

        async {
            let renderer = Arc::clone(&self.renderer);
            let RenderRequest { template_id, data } = request;
            let outcome = self
                .exchange("render", async move {
                    renderer.render(&template_id, data).await
                })
                .await;

            match outcome {
                Ok(output) => RenderReply::ok(output),
                Err(failure) => RenderReply::failed(&failure),
            }
        }
        .instrument(span)
        .await
    }

    pub async fn flush(&self, _request: FlushRequest) -> FlushReply {
        info_span!("flush", request_id = %Uuid::new_v4()).in_scope(|| {
            let removed = self.store.clear();
            counter!(METRIC_CACHE_FLUSH_TOTAL).increment(1);
            info!(target = "sagoma::router", removed, "Template cache flushed");
        });
        FlushReply::ok()
    }

    pub async fn dispatch(&self, request: Request) -> Reply {
        match request {
            Request::Compile(request) => Reply::Compile(self.compile(request).await),
            Request::Render(request) => Reply::Render(self.render(request).await),
            Request::Flush(request) => Reply::Flush(self.flush(request).await),
        }
    }

    async fn exchange<T, F>(&self, operation: &'static str, work: F) -> Result<T, TemplateFailure>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, TemplateFailure>> + Send + 'static,
    {
        let task = tokio::spawn(work.in_current_span());

        let result = match tokio::time::timeout(self.reply_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(TemplateFailure::unexpected(format!(
                "{operation} task did not finish: {join_err}"
            ))),
            Err(_) => {
                counter!(METRIC_REPLY_TIMEOUT_TOTAL, "operation" => operation).increment(1);
                Err(TemplateFailure::timeout(self.reply_timeout))
            }
        };

        if let Err(failure) = &result {
            report_failure(operation, failure);
        }
        result
    }
}

fn report_failure(operation: &'static str, failure: &TemplateFailure) {
    match failure {
        TemplateFailure::Unexpected { detail } => error!(
            target = "sagoma::router",
            operation,
            detail = %detail,
            "Request failed unexpectedly"
        ),
        other => warn!(
            target = "sagoma::router",
            operation,
            kind = other.kind().as_str(),
            error = %other,
            "Request failed"
        ),
    }
}
