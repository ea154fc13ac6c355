//! fleetstats library crate.
//!
//! Aggregates live activity, watch statistics and per-user history from
//! many independent media monitoring servers behind one HTTP API.

pub mod api;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod fanout;
pub mod geo;
pub mod images;
pub mod logging;
pub mod registry;
pub mod services;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
