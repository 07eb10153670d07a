//! Infrastructure adapters and runtime bootstrap.

pub mod engine;
pub mod error;
pub mod http;
pub mod source;
pub mod telemetry;
