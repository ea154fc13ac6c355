//! Streams bytes to the caller while copying them into a cache file.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

enum CacheWrite {
    Chunk(Bytes),
    /// The upstream body ended cleanly.
    Finish,
}

/// Caller-facing half of the tee.
///
/// Dropping it before the upstream ends (client disconnect) or forwarding an
/// upstream error closes the channel without `Finish`, which discards the
/// temporary file.
pub(super) struct TeeStream {
    inner: BoxStream<'static, io::Result<Bytes>>,
    writer: Option<mpsc::UnboundedSender<CacheWrite>>,
}

impl Stream for TeeStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                let closed = this
                    .writer
                    .as_ref()
                    .is_some_and(|tx| tx.send(CacheWrite::Chunk(chunk.clone())).is_err());
                if closed {
                    // Writer gave up; keep serving the caller.
                    this.writer = None;
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.writer = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if let Some(tx) = this.writer.take() {
                    let _ = tx.send(CacheWrite::Finish);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Wrap `upstream` so every chunk is also written to `final_path`.
pub(super) fn tee_to_file(
    upstream: BoxStream<'static, io::Result<Bytes>>,
    final_path: PathBuf,
    cache_dir: PathBuf,
) -> TeeStream {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(write_cache_file(rx, final_path, cache_dir));
    TeeStream {
        inner: upstream,
        writer: Some(tx),
    }
}

async fn write_cache_file(
    mut rx: mpsc::UnboundedReceiver<CacheWrite>,
    final_path: PathBuf,
    cache_dir: PathBuf,
) {
    let file_name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = cache_dir.join(format!("{file_name}.tmp-{}", uuid::Uuid::new_v4()));

    let outcome: io::Result<bool> = async {
        fs::create_dir_all(&cache_dir).await?;
        let mut file = File::create(&tmp_path).await?;
        while let Some(message) = rx.recv().await {
            match message {
                CacheWrite::Chunk(chunk) => file.write_all(&chunk).await?,
                CacheWrite::Finish => {
                    file.flush().await?;
                    drop(file);
                    fs::rename(&tmp_path, &final_path).await?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
    .await;

    match outcome {
        Ok(true) => debug!(path = %final_path.display(), "Image cached"),
        Ok(false) => {
            debug!(path = %final_path.display(), "Image download incomplete; not cached");
            discard(&tmp_path).await;
        }
        Err(e) => {
            warn!(path = %final_path.display(), error = %e, "Failed to write image cache entry");
            discard(&tmp_path).await;
        }
    }
}

async fn discard(tmp_path: &Path) {
    if let Err(e) = fs::remove_file(tmp_path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!(path = %tmp_path.display(), error = %e, "Failed to remove temporary cache file");
    }
}
