use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{TemplateFailure, TemplateId};

use super::inflight::InFlightCompiles;
use super::{CompileOutcome, Compiler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    pub workers: NonZeroUsize,
    pub queue_depth: NonZeroUsize,
    pub single_flight: bool,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            queue_depth: NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
            single_flight: false,
        }
    }
}

enum ReplyTo {
    Caller(oneshot::Sender<CompileOutcome>),
    Shared(InFlightCompiles),
}

/// A queued compile. `reply` is taken once the outcome is delivered; a job
/// dropped before that (never sent, still queued at shutdown, or aborted
/// mid-compile) releases its single-flight waiters on drop.
struct CompileJob {
    id: TemplateId,
    reply: Option<ReplyTo>,
}

impl CompileJob {
    fn new(id: &TemplateId, reply: ReplyTo) -> Self {
        Self {
            id: id.clone(),
            reply: Some(reply),
        }
    }

    fn finish(mut self, outcome: CompileOutcome) {
        match self.reply.take() {
            Some(ReplyTo::Caller(reply)) => {
                if reply.send(outcome).is_err() {
                    debug!(
                        template_id = %self.id,
                        "Compile finished after requester stopped waiting"
                    );
                }
            }
            Some(ReplyTo::Shared(inflight)) => inflight.complete(&self.id, &outcome),
            None => {}
        }
    }
}

impl Drop for CompileJob {
    fn drop(&mut self) {
        // A dropped caller sender already wakes its receiver with an error.
        if let Some(ReplyTo::Shared(inflight)) = self.reply.take() {
            debug!(template_id = %self.id, "Compile job dropped before it finished");
            inflight.abandon(&self.id, WORKERS_STOPPED);
        }
    }
}

/// Cloneable front door to the compile workers.
#[derive(Clone)]
pub struct CompilerHandle {
    jobs: mpsc::Sender<CompileJob>,
    inflight: Option<InFlightCompiles>,
}

impl CompilerHandle {
    /// Queue a compile of `id` and wait for its outcome.
    ///
    /// Dropping the returned future abandons only the wait; a queued or running
    /// compile still finishes and still updates the store.
    pub async fn request(&self, id: &TemplateId) -> CompileOutcome {
        match &self.inflight {
            None => self.request_exclusive(id).await,
            Some(inflight) => self.request_shared(inflight, id).await,
        }
    }

    async fn request_exclusive(&self, id: &TemplateId) -> CompileOutcome {
        let (tx, rx) = oneshot::channel();
        let job = CompileJob::new(id, ReplyTo::Caller(tx));
        if self.jobs.send(job).await.is_err() {
            return Err(workers_stopped());
        }
        rx.await.unwrap_or_else(|_| Err(workers_stopped()))
    }

    async fn request_shared(&self, inflight: &InFlightCompiles, id: &TemplateId) -> CompileOutcome {
        let subscription = inflight.subscribe(id);
        if subscription.leader {
            // If the send fails, or this future is dropped while the queue is
            // full, the job is dropped unsent and abandons the waiters.
            let job = CompileJob::new(id, ReplyTo::Shared(inflight.clone()));
            let _ = self.jobs.send(job).await;
        }
        subscription
            .receiver
            .await
            .unwrap_or_else(|_| Err(workers_stopped()))
    }
}

const WORKERS_STOPPED: &str = "compile workers are not running";

fn workers_stopped() -> TemplateFailure {
    TemplateFailure::unexpected(WORKERS_STOPPED)
}

/// Running compile workers plus the handle used to reach them.
pub struct CompilerPool {
    handle: CompilerHandle,
    workers: Vec<JoinHandle<()>>,
}

impl CompilerPool {
    pub fn handle(&self) -> CompilerHandle {
        self.handle.clone()
    }

    /// Stop the workers. Jobs still queued or running are dropped and their
    /// requesters see an unexpected failure.
    pub async fn shutdown(self) {
        for worker in &self.workers {
            worker.abort();
        }
        for worker in self.workers {
            let _ = worker.await;
        }
        info!("Compile workers stopped");
    }
}

/// Start `options.workers` tasks draining a queue of `options.queue_depth` jobs.
pub fn spawn_compile_workers(compiler: Arc<Compiler>, options: WorkerOptions) -> CompilerPool {
    let (tx, rx) = mpsc::channel(options.queue_depth.get());
    let jobs = Arc::new(Mutex::new(rx));

    let workers = (0..options.workers.get())
        .map(|index| {
            let compiler = Arc::clone(&compiler);
            let jobs = Arc::clone(&jobs);
            tokio::spawn(run_worker(index, compiler, jobs))
        })
        .collect::<Vec<_>>();

    info!(
        workers = workers.len(),
        queue_depth = options.queue_depth.get(),
        single_flight = options.single_flight,
        "Compile workers started"
    );

    CompilerPool {
        handle: CompilerHandle {
            jobs: tx,
            inflight: options.single_flight.then(InFlightCompiles::new),
        },
        workers,
    }
}

async fn run_worker(
    index: usize,
    compiler: Arc<Compiler>,
    jobs: Arc<Mutex<mpsc::Receiver<CompileJob>>>,
) {
    debug!(worker = index, "Compile worker ready");
    loop {
        let next = { jobs.lock().await.recv().await };
        let Some(job) = next else {
            break;
        };
        let outcome = compiler.compile_and_store(&job.id).await;
        job.finish(outcome);
    }
    debug!(worker = index, "Compile queue closed");
}
