//! Repository layer for database access.

pub mod geo_cache;
pub mod server;

pub use geo_cache::*;
pub use server::*;
