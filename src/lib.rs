//! Compiled template cache with staleness detection and a request/reply front end.
//!
//! Layers follow the usual split: `domain` holds identifiers and failures,
//! `cache` the artifact store, `application` the compile and render roles plus
//! the router, `infra` the concrete sources, engine, telemetry and HTTP.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
