//! REST API server module.
//!
//! Serves the aggregated network views, server registration and the image
//! cache to the dashboard.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
