//! Request and response bodies shared by the routes.

use serde::{Deserialize, Serialize};
use upstream_api::StatsType;

use crate::api::error::{ApiError, ApiResult};
use crate::registry::ServerSelection;
use crate::services::clamp_days;

/// `?days=&server=&mode=` accepted by the aggregate views.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<u32>,
    pub server: Option<String>,
    pub mode: Option<String>,
}

impl WindowQuery {
    pub fn days(&self) -> u32 {
        clamp_days(self.days)
    }

    pub fn selection(&self) -> ApiResult<ServerSelection> {
        self.server
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(ApiError::from)
    }

    pub fn mode(&self) -> ApiResult<StatsType> {
        match self.mode.as_deref().map(str::trim) {
            None | Some("") => Ok(StatsType::Plays),
            Some(m) if m.eq_ignore_ascii_case("plays") => Ok(StatsType::Plays),
            Some(m) if m.eq_ignore_ascii_case("duration") => Ok(StatsType::Duration),
            Some(other) => Err(ApiError::validation(format!(
                "mode must be 'plays' or 'duration', got '{other}'"
            ))),
        }
    }
}

/// `?server=` accepted by point-in-time views with fixed windows.
#[derive(Debug, Default, Deserialize)]
pub struct ServerQuery {
    pub server: Option<String>,
}

impl ServerQuery {
    pub fn selection(&self) -> ApiResult<ServerSelection> {
        self.server
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(ApiError::from)
    }
}

/// `?img=&width=&height=` of the image proxy.
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub img: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLogFilterRequest {
    pub filter: String,
}

#[derive(Debug, Serialize)]
pub struct LoggingConfigResponse {
    pub filter: String,
    pub available_modules: Vec<ModuleInfo>,
}

#[derive(Debug, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_query_defaults() {
        let query = WindowQuery::default();
        assert_eq!(query.days(), 30);
        assert_eq!(query.selection().unwrap(), ServerSelection::All);
        assert_eq!(query.mode().unwrap(), StatsType::Plays);
    }

    #[test]
    fn window_query_parses_values() {
        let query = WindowQuery {
            days: Some(0),
            server: Some("3".into()),
            mode: Some("Duration".into()),
        };
        assert_eq!(query.days(), 1);
        assert_eq!(query.selection().unwrap(), ServerSelection::Only(3));
        assert_eq!(query.mode().unwrap(), StatsType::Duration);

        let bad = WindowQuery {
            mode: Some("minutes".into()),
            server: Some("x".into()),
            ..Default::default()
        };
        assert!(bad.mode().is_err());
        assert!(bad.selection().is_err());
    }

    #[test]
    fn server_query_selection() {
        assert_eq!(ServerQuery::default().selection().unwrap(), ServerSelection::All);
        let only = ServerQuery {
            server: Some("all".into()),
        };
        assert_eq!(only.selection().unwrap(), ServerSelection::All);
        let bad = ServerQuery {
            server: Some("first".into()),
        };
        assert!(bad.selection().is_err());
    }
}
