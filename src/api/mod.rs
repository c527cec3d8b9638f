//! HTTP surface for vital-sign clients.
//!
//! `POST /analyze` turns a vital-signs event into an advisory;
//! `GET /health` reports retrieval mode and counters.
//! `api_router()` returns a plain `Router` so it can be mounted on any
//! axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::ApiContext;
