//! In-process caches.

mod metadata;

pub use metadata::{METADATA_TTL, MetadataCache, MetadataCacheEntry, ServerSnapshot};
