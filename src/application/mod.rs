//! Application services: compile and render roles and the router in front of them.

pub mod compile;
pub mod engine;
pub mod error;
pub mod messages;
pub mod render;
pub mod router;
pub mod service;
pub mod source;
