//! # api-adapters
//!
//! The HTTP surface of the barter backend. The axum implementation lives
//! behind the `web-axum` feature; the wire DTOs and HTTP metrics are shared.

pub mod dto;
pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod web;

pub use metrics::HttpMetrics;

#[cfg(feature = "web-axum")]
pub use web::{router, AppState};
