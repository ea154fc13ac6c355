//! Database row models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered upstream server.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UpstreamServer {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    /// API key sent with every upstream call. Never serialized to clients.
    #[serde(skip_serializing)]
    pub credential: String,
    /// Unix epoch milliseconds (UTC) when created.
    pub created_at: i64,
    /// Unix epoch milliseconds (UTC) when last updated.
    pub updated_at: i64,
}

impl UpstreamServer {
    /// Upstream endpoint for this server.
    pub fn endpoint(&self) -> upstream_api::Endpoint<'_> {
        upstream_api::Endpoint::new(&self.base_url, &self.credential)
    }
}

/// Fields accepted when creating or replacing a server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInput {
    pub name: String,
    pub base_url: String,
    pub credential: String,
}

impl ServerInput {
    /// Trim and validate user-supplied fields.
    pub fn validated(self) -> crate::Result<Self> {
        let name = self.name.trim().to_string();
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        let credential = self.credential.trim().to_string();

        if name.is_empty() {
            return Err(crate::Error::validation("name must not be empty"));
        }
        if credential.is_empty() {
            return Err(crate::Error::validation("credential must not be empty"));
        }
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| crate::Error::validation(format!("invalid base_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(crate::Error::validation("base_url must be http or https"));
        }

        Ok(Self {
            name,
            base_url,
            credential,
        })
    }
}

/// A row of the persistent geo cache.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct GeoCacheDbModel {
    /// Normalized IP (see `geo::normalize_ip_key`).
    pub ip_key: String,
    pub lat: f64,
    pub lon: f64,
    pub city: Option<String>,
    pub country: Option<String>,
    /// Unix epoch milliseconds (UTC) of the last write.
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, url: &str, key: &str) -> ServerInput {
        ServerInput {
            name: name.into(),
            base_url: url.into(),
            credential: key.into(),
        }
    }

    #[test]
    fn validation_trims_and_strips_trailing_slash() {
        let ok = input(" Home ", "http://10.0.0.2:8181/ ", "abc")
            .validated()
            .unwrap();
        assert_eq!(ok.name, "Home");
        assert_eq!(ok.base_url, "http://10.0.0.2:8181");
    }

    #[test]
    fn validation_rejects_bad_input() {
        assert!(input("", "http://a", "k").validated().is_err());
        assert!(input("a", "ftp://a", "k").validated().is_err());
        assert!(input("a", "not a url", "k").validated().is_err());
        assert!(input("a", "http://a", " ").validated().is_err());
    }

    #[test]
    fn credential_is_not_serialized() {
        let server = UpstreamServer {
            id: 1,
            name: "a".into(),
            base_url: "http://a".into(),
            credential: "secret".into(),
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_string(&server).unwrap();
        assert!(!json.contains("secret"));
    }
}
