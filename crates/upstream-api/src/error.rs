use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("upstream rejected the credential")]
    Unauthorized,
    #[error("upstream returned result '{result}': {message}")]
    Envelope { result: String, message: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
