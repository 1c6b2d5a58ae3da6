//! HTTP search service.
//!
//! Wires the parser manager behind an axum router: DTO validation and
//! conversion, the search façade, CORS, per-IP rate limiting, request
//! logging and Prometheus metrics.

pub mod config;
pub mod converters;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use service::SearchService;
pub use state::AppState;
