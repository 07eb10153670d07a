//! Compile role: turns template source into cached artifacts.
//!
//! Compiles never run on the request path. Requests are queued to a small pool
//! of worker tasks, and the engine itself runs on the blocking thread pool.

mod compiler;
mod inflight;
mod workers;

use std::sync::Arc;

use crate::cache::CacheEntry;
use crate::domain::TemplateFailure;

pub use compiler::Compiler;
pub use inflight::InFlightCompiles;
pub use workers::{CompilerHandle, CompilerPool, WorkerOptions, spawn_compile_workers};

pub type CompileOutcome = Result<Arc<CacheEntry>, TemplateFailure>;
