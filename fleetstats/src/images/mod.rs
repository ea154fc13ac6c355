//! Content-addressed on-disk cache for upstream images.
//!
//! A request is identified by `(server_id, image_path, width, height)` and
//! stored under the hex MD5 of those fields. Hits are streamed from disk.
//! Misses are streamed from the upstream image proxy to the caller while a
//! background task tees the same bytes into a temporary file, which is only
//! renamed into place once the upstream body has been read to the end.

mod tee;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use md5::{Digest, Md5};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use upstream_api::{BULK_TIMEOUT, UpstreamClient, UpstreamError};

use crate::registry::ServerRegistry;
use crate::{Error, Result};

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Whether a response was served from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

pub struct ImageStream {
    pub cache_status: CacheStatus,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, io::Result<Bytes>>,
}

/// Cache key for an image request: lowercase hex MD5 of
/// `"{server_id}:{image_path}:{width}:{height}"`.
pub fn cache_key(server_id: i64, image_path: &str, width: u32, height: u32) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{server_id}:{image_path}:{width}:{height}").as_bytes());
    hex::encode(hasher.finalize())
}

/// Content type from the leading bytes of an image.
pub fn sniff_content_type(head: &[u8]) -> &'static str {
    match head {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

pub struct ImageCacheProxy {
    cache_dir: PathBuf,
    registry: Arc<ServerRegistry>,
    client: UpstreamClient,
}

impl ImageCacheProxy {
    pub fn new(cache_dir: impl Into<PathBuf>, registry: Arc<ServerRegistry>, client: UpstreamClient) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            registry,
            client,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(key)
    }

    /// Serve an image from disk, or stream it from the upstream while caching it.
    pub async fn fetch(
        &self,
        server_id: i64,
        image_path: &str,
        width: u32,
        height: u32,
    ) -> Result<ImageStream> {
        if image_path.trim().is_empty() {
            return Err(Error::validation("img must not be empty"));
        }

        let key = cache_key(server_id, image_path, width, height);
        let path = self.cache_path(&key);

        match open_cached(&path).await {
            Ok(Some(hit)) => {
                debug!(server_id, %key, "Image cache hit");
                return Ok(hit);
            }
            Ok(None) => debug!(server_id, %key, "Image cache miss"),
            Err(e) => warn!(path = %path.display(), error = %e, "Unreadable image cache entry; refetching"),
        }

        let server = self
            .registry
            .get_server(server_id)
            .await?
            .ok_or_else(|| Error::not_found("Server", server_id.to_string()))?;

        let response = self
            .client
            .fetch_image(server.endpoint(), image_path, width, height, BULK_TIMEOUT)
            .await
            .map_err(|e| match e {
                UpstreamError::Unauthorized => Error::UpstreamAuth {
                    server: server.name.clone(),
                },
                other => Error::Upstream(other),
            })?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let content_length = response.content_length();

        let upstream = response.bytes_stream().map_err(io::Error::other).boxed();
        let body = tee::tee_to_file(upstream, path, self.cache_dir.clone()).boxed();

        Ok(ImageStream {
            cache_status: CacheStatus::Miss,
            content_type,
            content_length,
            body,
        })
    }
}

/// Open a cached file and sniff its type. `Ok(None)` when absent.
async fn open_cached(path: &Path) -> io::Result<Option<ImageStream>> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let len = file.metadata().await?.len();
    let mut head = [0u8; 16];
    let read = file.read(&mut head).await?;
    file.seek(io::SeekFrom::Start(0)).await?;

    Ok(Some(ImageStream {
        cache_status: CacheStatus::Hit,
        content_type: sniff_content_type(&head[..read]).to_string(),
        content_length: Some(len),
        body: ReaderStream::new(file).boxed(),
    }))
}
