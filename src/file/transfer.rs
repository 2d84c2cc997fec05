//! Streaming transfers between HTTP bodies and files in the storage root.
//!
//! Uploads are copied chunk by chunk: a chunk is written to disk before the
//! next one is polled from the body, so a slow disk slows the client down
//! instead of growing a buffer. Downloads are served from a [`ReaderStream`]
//! over the open file.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::{pin, Pin};
use std::task::{ready, Context, Poll};
use std::time::Duration;

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::io::ReaderStream;

use super::StoreError;

/// Which way bytes flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to disk (POST).
    Inbound,
    /// Disk to client (GET).
    Outbound,
}

/// Why a transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every byte was moved.
    Completed,
    /// The peer disconnected, truncated the body or stalled.
    ClientClosed,
    /// The upload went past the size limit.
    SizeExceeded,
    /// Filesystem failure.
    IoError,
}

impl Termination {
    /// Short name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::ClientClosed => "client-closed",
            Termination::SizeExceeded => "size-exceeded",
            Termination::IoError => "io-error",
        }
    }

    fn of(err: &StoreError) -> Self {
        match err {
            StoreError::TooLarge { .. } => Termination::SizeExceeded,
            StoreError::ClientClosed => Termination::ClientClosed,
            _ => Termination::IoError,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping for one in-flight transfer.
#[derive(Debug)]
pub struct Transfer {
    name: String,
    direction: Direction,
    bytes: u64,
    limit: Option<u64>,
}

impl Transfer {
    /// An upload bounded by `limit` bytes.
    pub fn inbound(name: impl Into<String>, limit: u64) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Inbound,
            bytes: 0,
            limit: Some(limit),
        }
    }

    /// A download.
    pub fn outbound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Outbound,
            bytes: 0,
            limit: None,
        }
    }

    /// Bytes moved so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Whether `len` more bytes would take the transfer past its limit.
    pub fn would_exceed(&self, len: usize) -> bool {
        self.limit
            .is_some_and(|limit| self.bytes.saturating_add(len as u64) > limit)
    }

    fn record(&mut self, len: usize) {
        self.bytes += len as u64;
    }

    fn finish(&self, cause: Termination) {
        match cause {
            Termination::Completed => tracing::info!(
                name = %self.name,
                direction = ?self.direction,
                bytes = self.bytes,
                cause = %cause,
                "Transfer finished"
            ),
            Termination::ClientClosed | Termination::SizeExceeded => tracing::warn!(
                name = %self.name,
                direction = ?self.direction,
                bytes = self.bytes,
                cause = %cause,
                "Transfer aborted"
            ),
            Termination::IoError => tracing::error!(
                name = %self.name,
                direction = ?self.direction,
                bytes = self.bytes,
                cause = %cause,
                "Transfer failed"
            ),
        }
    }
}

/// Limits applied to an upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Maximum number of body bytes.
    pub max_bytes: u64,
    /// Maximum wait for the next body chunk.
    pub idle_timeout: Duration,
}

/// An upload destination that is removed unless the upload commits.
///
/// Dropping it uncommitted (e.g. when the request future is cancelled
/// because the connection went away) deletes the file.
#[derive(Debug)]
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }

    async fn discard(mut self) {
        self.committed = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial upload");
            }
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Blocking on purpose: the file must be gone once the guard is,
        // including when the runtime is shutting down.
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed abandoned upload"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove abandoned upload")
            }
        }
    }
}

/// Upload destination that can be forced to stable storage.
trait DurableWrite: AsyncWrite + Unpin {
    fn persist(&mut self) -> impl Future<Output = io::Result<()>> + Send + '_;
}

impl DurableWrite for File {
    fn persist(&mut self) -> impl Future<Output = io::Result<()>> + Send + '_ {
        File::sync_all(self)
    }
}

/// Receive `body` into a new file at `path`.
///
/// The file is created with `create_new`, so of several concurrent uploads to
/// the same path exactly one gets past this point; the others see
/// [`StoreError::AlreadyExists`]. On any failure after creation the partial
/// file is removed before returning.
///
/// Returns the number of bytes stored.
pub async fn receive_to_file<S, E>(
    path: &Path,
    name: &str,
    body: S,
    limits: UploadLimits,
) -> Result<u64, StoreError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    // Created in the same poll that arms the guard, so a cancelled upload
    // can never leave a file behind with nothing to remove it.
    let file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to create upload file");
            return Err(StoreError::Io(e));
        }
    };
    let partial = PartialFile::new(path);

    store_body(File::from_std(file), partial, name, body, limits).await
}

/// Copy `body` into `writer`, then commit or discard `partial`.
async fn store_body<W, S, E>(
    writer: W,
    partial: PartialFile,
    name: &str,
    body: S,
    limits: UploadLimits,
) -> Result<u64, StoreError>
where
    W: DurableWrite,
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    let mut transfer = Transfer::inbound(name, limits.max_bytes);

    match copy_body(writer, body, &mut transfer, limits).await {
        Ok(()) => {
            partial.commit();
            transfer.finish(Termination::Completed);
            Ok(transfer.bytes())
        }
        Err(err) => {
            partial.discard().await;
            transfer.finish(Termination::of(&err));
            Err(err)
        }
    }
}

/// Copy the body into `writer`, then flush and persist. The writer is
/// dropped on return whatever the outcome.
async fn copy_body<W, S, E>(
    mut writer: W,
    body: S,
    transfer: &mut Transfer,
    limits: UploadLimits,
) -> Result<(), StoreError>
where
    W: DurableWrite,
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    let mut body = pin!(body);

    loop {
        let chunk = match timeout(limits.idle_timeout, body.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %e, "Upload body ended early");
                return Err(StoreError::ClientClosed);
            }
            Err(_) => {
                tracing::debug!(
                    idle_secs = limits.idle_timeout.as_secs_f64(),
                    "Upload stalled"
                );
                return Err(StoreError::ClientClosed);
            }
        };

        if transfer.would_exceed(chunk.len()) {
            return Err(StoreError::TooLarge {
                limit: limits.max_bytes,
            });
        }

        writer.write_all(&chunk).await?;
        transfer.record(chunk.len());
    }

    writer.flush().await?;
    writer.persist().await?;
    Ok(())
}

/// An opened file ready to be streamed to a client.
#[derive(Debug)]
pub struct Download {
    /// MIME type guessed from the file extension.
    pub content_type: String,
    /// File length at open time.
    pub len: u64,
    /// File contents in chunks.
    pub stream: DownloadStream,
}

/// Open `path` for streaming.
///
/// A missing path or one that is not a regular file is
/// [`StoreError::NotFound`].
pub async fn open_for_download(
    path: &Path,
    name: &str,
    chunk_size: usize,
) -> Result<Download, StoreError> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to open file");
            return Err(StoreError::Io(e));
        }
    };

    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(StoreError::NotFound(name.to_string()));
    }

    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    Ok(Download {
        content_type,
        len: metadata.len(),
        stream: DownloadStream::new(file, name, chunk_size),
    })
}

/// Body stream for a download.
///
/// Owns the file handle; dropping the stream closes it. If it is dropped
/// before reaching the end of the file, the client went away and the
/// transfer is logged as `client-closed`.
///
/// A read error after the response head was sent is yielded as a stream
/// error. The status line is already committed by then, so the transport
/// aborts the connection and the client sees a truncated response.
#[derive(Debug)]
pub struct DownloadStream {
    inner: ReaderStream<File>,
    transfer: Transfer,
    outcome: Option<Termination>,
}

impl DownloadStream {
    fn new(file: File, name: &str, chunk_size: usize) -> Self {
        Self {
            inner: ReaderStream::with_capacity(file, chunk_size),
            transfer: Transfer::outbound(name),
            outcome: None,
        }
    }
}

impl Stream for DownloadStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.outcome.is_some() {
            return Poll::Ready(None);
        }

        match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
            Some(Ok(chunk)) => {
                this.transfer.record(chunk.len());
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Read error while streaming download");
                this.outcome = Some(Termination::IoError);
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.outcome = Some(Termination::Completed);
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for DownloadStream {
    fn drop(&mut self) {
        self.transfer
            .finish(self.outcome.unwrap_or(Termination::ClientClosed));
    }
}
