//! GeoLite2/GeoIP2 City database backend.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::{Reader, geoip2};
use tracing::{debug, info};

use super::{GeoDatabase, GeoLocation};
use crate::{Error, Result};

/// Offline lookup against a `.mmdb` City database loaded into memory.
pub struct MaxMindGeoDatabase {
    reader: Reader<Vec<u8>>,
}

impl MaxMindGeoDatabase {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = Reader::open_readfile(path).map_err(|e| {
            Error::config(format!("failed to open geo database {}: {e}", path.display()))
        })?;
        info!(
            path = %path.display(),
            database_type = %reader.metadata.database_type,
            "Offline geo database loaded"
        );
        Ok(Self { reader })
    }
}

impl GeoDatabase for MaxMindGeoDatabase {
    fn lookup(&self, ip: IpAddr) -> Option<GeoLocation> {
        let record: geoip2::City = match self.reader.lookup(ip) {
            Ok(record) => record,
            Err(e) => {
                debug!(%ip, error = %e, "No geo database record");
                return None;
            }
        };

        let location = record.location?;
        let lat = location.latitude?;
        let lon = location.longitude?;

        let city = record
            .city
            .and_then(|c| c.names)
            .and_then(|names| names.get("en").map(|name| name.to_string()));
        let country = record
            .country
            .and_then(|c| c.iso_code)
            .map(str::to_string);

        Some(GeoLocation {
            lat,
            lon,
            city,
            country,
        })
    }
}
