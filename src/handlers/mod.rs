//! Shared HTTP state and service-level handlers.

pub mod http;

pub use http::*;
