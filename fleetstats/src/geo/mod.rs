//! IP geolocation with a persistent cache and an offline fallback.
//!
//! The hot path ([`GeoResolver::batch_resolve`]) reads the persistent cache
//! for many addresses in one query and never touches the offline database.
//! Addresses it misses go through [`GeoResolver::resolve_one`], which falls
//! back to the offline database and writes successful results back.

mod maxmind;

pub use maxmind::MaxMindGeoDatabase;

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::database::models::GeoCacheDbModel;
use crate::database::repositories::GeoCacheRepository;
use crate::database::time::now_ms;

/// Approximate location of an address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<GeoCacheDbModel> for GeoLocation {
    fn from(row: GeoCacheDbModel) -> Self {
        Self {
            lat: row.lat,
            lon: row.lon,
            city: row.city,
            country: row.country,
        }
    }
}

/// Offline IP -> location database, queried synchronously.
pub trait GeoDatabase: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Option<GeoLocation>;
}

/// Storage key for an IP string: `.` becomes `_` and `:` becomes `-`.
pub fn normalize_ip_key(ip: &str) -> String {
    ip.chars()
        .map(|c| match c {
            '.' => '_',
            ':' => '-',
            other => other,
        })
        .collect()
}

/// Exact inverse of [`normalize_ip_key`] for any IPv4/IPv6 text.
pub fn denormalize_ip_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '_' => '.',
            '-' => ':',
            other => other,
        })
        .collect()
}

/// Whether an address can have a meaningful public location.
fn is_routable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_multicast())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            let unique_local = first & 0xfe00 == 0xfc00;
            let link_local = first & 0xffc0 == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || v6.is_multicast() || unique_local || link_local)
        }
    }
}

pub struct GeoResolver {
    cache: Arc<dyn GeoCacheRepository>,
    database: Option<Arc<dyn GeoDatabase>>,
}

impl GeoResolver {
    pub fn new(cache: Arc<dyn GeoCacheRepository>, database: Option<Arc<dyn GeoDatabase>>) -> Self {
        Self { cache, database }
    }

    /// One batched cache read for all `ips`. Returns only cache hits, keyed by
    /// the caller's original IP strings.
    pub async fn batch_resolve(&self, ips: &HashSet<String>) -> HashMap<String, GeoLocation> {
        if ips.is_empty() {
            return HashMap::new();
        }

        let keys: Vec<String> = ips.iter().map(|ip| normalize_ip_key(ip)).collect();
        let rows = match self.cache.get_many(&keys).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, count = keys.len(), "Geo cache batch read failed");
                return HashMap::new();
            }
        };

        rows.into_iter()
            .filter_map(|row| {
                let ip = denormalize_ip_key(&row.ip_key);
                ips.contains(&ip).then(|| (ip, GeoLocation::from(row)))
            })
            .collect()
    }

    /// Resolve a single address: cache first, then the offline database.
    ///
    /// A database hit is written back to the cache without waiting for the
    /// write. Misses are not cached.
    pub async fn resolve_one(&self, ip: &str) -> Option<GeoLocation> {
        let addr: IpAddr = ip.trim().parse().ok()?;
        if !is_routable(&addr) {
            return None;
        }

        let key = normalize_ip_key(ip);
        match self.cache.get(&key).await {
            Ok(Some(row)) => return Some(row.into()),
            Ok(None) => {}
            Err(e) => warn!(%ip, error = %e, "Geo cache read failed"),
        }

        let location = self.database.as_ref()?.lookup(addr)?;
        debug!(%ip, lat = location.lat, lon = location.lon, "Resolved via offline geo database");

        let row = GeoCacheDbModel {
            ip_key: key,
            lat: location.lat,
            lon: location.lon,
            city: location.city.clone(),
            country: location.country.clone(),
            updated_at: now_ms(),
        };
        let cache = self.cache.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.upsert(&row).await {
                warn!(ip_key = %row.ip_key, error = %e, "Failed to persist geo location");
            }
        });

        Some(location)
    }

    /// Batch pass followed by single lookups for the stragglers.
    pub async fn resolve_all(&self, ips: &HashSet<String>) -> HashMap<String, GeoLocation> {
        let mut resolved = self.batch_resolve(ips).await;

        let misses: Vec<&String> = ips.iter().filter(|ip| !resolved.contains_key(*ip)).collect();
        let lookups = misses.into_iter().map(|ip| async move {
            let location = self.resolve_one(ip).await;
            (ip.clone(), location)
        });

        for (ip, location) in join_all(lookups).await {
            if let Some(location) = location {
                resolved.insert(ip, location);
            }
        }
        resolved
    }
}
