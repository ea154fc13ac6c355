//! Client for the REST API exposed by each monitored media server.
//!
//! Every command is a `GET {base}/api/v2?apikey=..&cmd=..` returning a JSON
//! envelope; see [`envelope`] for the success rule and [`models`] for the
//! leniently-decoded payloads.

pub mod client;
pub mod command;
pub mod envelope;
pub mod error;
pub mod models;

pub use client::{Endpoint, UpstreamClient, default_client, install_rustls_provider};
pub use command::{
    BULK_TIMEOUT, Command, HEALTH_TIMEOUT, HISTORY_TIMEOUT, STANDARD_TIMEOUT, StatsType,
};
pub use error::UpstreamError;
pub use models::*;
