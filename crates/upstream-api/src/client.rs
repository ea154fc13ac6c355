use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::command::Command;
use crate::envelope::decode_envelope;
use crate::error::UpstreamError;

const USER_AGENT: &str = concat!("upstream-api/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const IMAGE_PROXY_COMMAND: &str = "pms_image_proxy";

/// Install the process-wide rustls crypto provider once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the default HTTP client used for upstream calls.
///
/// Per-request timeouts are set by the caller; only the connect phase is
/// bounded here.
pub fn default_client() -> Client {
    install_rustls_provider();

    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(8)
        .build()
        .unwrap_or_else(|error| {
            warn!(error = %error, "Failed to build upstream HTTP client; falling back to reqwest defaults");
            Client::new()
        })
}

/// Connection details of one upstream server.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub base_url: &'a str,
    pub credential: &'a str,
}

impl<'a> Endpoint<'a> {
    pub fn new(base_url: &'a str, credential: &'a str) -> Self {
        Self {
            base_url,
            credential,
        }
    }

    fn api_url(&self, command: &str) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(self.base_url.trim())
            .map_err(|e| UpstreamError::InvalidUrl(format!("{}: {e}", self.base_url)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(UpstreamError::InvalidUrl(format!(
                    "unsupported scheme '{other}'"
                )));
            }
        }

        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .push("v2");

        url.query_pairs_mut()
            .append_pair("apikey", self.credential)
            .append_pair("cmd", command);

        Ok(url)
    }
}

/// Client for the per-server query protocol.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new() -> Self {
        Self::with_client(default_client())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// URL for a command, including the credential and all parameters.
    pub fn command_url(&self, endpoint: Endpoint<'_>, command: &Command) -> Result<Url, UpstreamError> {
        let mut url = endpoint.api_url(command.name())?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in command.params() {
                pairs.append_pair(key, &value);
            }
        }
        Ok(url)
    }

    /// URL of the upstream image proxy for `img` resized to `width`x`height`.
    pub fn image_url(
        &self,
        endpoint: Endpoint<'_>,
        img: &str,
        width: u32,
        height: u32,
    ) -> Result<Url, UpstreamError> {
        let mut url = endpoint.api_url(IMAGE_PROXY_COMMAND)?;
        url.query_pairs_mut()
            .append_pair("img", img)
            .append_pair("width", &width.to_string())
            .append_pair("height", &height.to_string());
        Ok(url)
    }

    /// Run one command and decode its envelope.
    ///
    /// A single attempt is made; `timeout` bounds the whole exchange including
    /// the body.
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint<'_>,
        command: &Command,
        timeout: Duration,
    ) -> Result<T, UpstreamError> {
        let url = self.command_url(endpoint, command)?;
        debug!(cmd = command.name(), host = url.host_str().unwrap_or_default(), "Upstream call");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response)?;
        let body = response.bytes().await.map_err(map_transport_error)?;
        decode_envelope(&body)
    }

    /// Start an image download; the body is left unread for streaming.
    pub async fn fetch_image(
        &self,
        endpoint: Endpoint<'_>,
        img: &str,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<reqwest::Response, UpstreamError> {
        let url = self.image_url(endpoint, img, width, height)?;
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response)
    }
}

impl Default for UpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(UpstreamError::Unauthorized),
        status if !status.is_success() => Err(UpstreamError::Status(status.as_u16())),
        _ => Ok(response),
    }
}

fn map_transport_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Http(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatsType;
    use axum::Router;
    use axum::routing::get;
    use tokio::net::TcpListener;

    #[test]
    fn command_url_keeps_base_path() {
        let client = UpstreamClient::new();
        let endpoint = Endpoint::new("http://example.com:8181/monitor/", "secret");
        let url = client
            .command_url(
                endpoint,
                &Command::GetHomeStats {
                    time_range: 30,
                    stats_type: StatsType::Plays,
                    stats_count: 10,
                },
            )
            .unwrap();
        assert_eq!(url.path(), "/monitor/api/v2");
        assert_eq!(
            url.query(),
            Some("apikey=secret&cmd=get_home_stats&time_range=30&stats_type=plays&stats_count=10")
        );
    }

    #[test]
    fn image_url_encodes_path() {
        let client = UpstreamClient::new();
        let url = client
            .image_url(
                Endpoint::new("https://example.com", "k"),
                "/library/metadata/5/thumb/17",
                300,
                450,
            )
            .unwrap();
        assert_eq!(url.path(), "/api/v2");
        assert!(url.as_str().contains("cmd=pms_image_proxy"));
        assert!(url.as_str().contains("img=%2Flibrary%2Fmetadata%2F5%2Fthumb%2F17"));
        assert!(url.as_str().ends_with("width=300&height=450"));
    }

    #[test]
    fn rejects_non_http_base_urls() {
        let client = UpstreamClient::new();
        let err = client
            .command_url(Endpoint::new("ftp://example.com", "k"), &Command::Status)
            .unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidUrl(_)));
    }

    async fn spawn_upstream(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn call_decodes_payload() {
        let app = Router::new().route(
            "/api/v2",
            get(|| async {
                r#"{"response":{"result":"success","data":{"stream_count":"3"}}}"#
            }),
        );
        let base = spawn_upstream(app).await;
        let client = UpstreamClient::new();
        let activity: crate::Activity = client
            .call(
                Endpoint::new(&base, "k"),
                &Command::GetActivity,
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(activity.stream_count, 3);
    }

    #[tokio::test]
    async fn unauthorized_is_distinguished() {
        let app = Router::new().route(
            "/api/v2",
            get(|| async { (axum::http::StatusCode::UNAUTHORIZED, "no") }),
        );
        let base = spawn_upstream(app).await;
        let client = UpstreamClient::new();
        let err = client
            .fetch_image(Endpoint::new(&base, "k"), "/x", 10, 10, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Unauthorized));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let app = Router::new().route(
            "/api/v2",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );
        let base = spawn_upstream(app).await;
        let client = UpstreamClient::new();
        let err = client
            .call::<serde_json::Value>(
                Endpoint::new(&base, "k"),
                &Command::Status,
                Duration::from_millis(100),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout));
    }
}
