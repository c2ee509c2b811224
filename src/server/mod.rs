//! HTTP backend exposing the generation flows.

pub mod api;
pub mod app;

pub use api::{ApiError, AppState, SharedState};
pub use app::{build_router, serve_on, start_server};
