//! Managed download queue.
//!
//! The interceptor only hands over a [`DownloadEntry`]; fetching happens on
//! a background worker that owns its own Tokio runtime, so the UI thread
//! never waits on the network. Each finished job is reported once through
//! the event callback, which the app forwards to the winit loop.
//!
//! ```text
//! UI thread ── enqueue() ──► mpsc ──► worker runtime
//!                                        └─ fetch → .part → rename
//!                                        └─ on_event(Completed | Failed)
//! ```
//!
//! Dropping the queue stops the worker: jobs still running are cancelled,
//! their temp files removed, and no event is reported for them.

use std::cell::Cell;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info};
use url::Url;

use crate::storage;

/// Downloads fetched in parallel; further jobs wait for a slot.
pub const MAX_CONCURRENT_DOWNLOADS: usize = 3;

/// How long shutdown waits for blocking file operations of cancelled jobs.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadId(pub u64);

/// One submission to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: Url,
    pub mime_type: Option<String>,
    /// Extra request headers (the forwarded `User-Agent`).
    pub headers: Vec<(String, String)>,
    pub title: String,
    pub description: String,
    /// Requested final path. A numbered variant is used if it is taken.
    pub destination: PathBuf,
    pub notify_on_completion: bool,
    pub allow_metered: bool,
    pub allow_roaming: bool,
}

/// Outcome of a queued download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Completed {
        id: DownloadId,
        title: String,
        path: PathBuf,
        notify: bool,
    },
    Failed {
        id: DownloadId,
        title: String,
        reason: String,
        notify: bool,
    },
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("destination has no file name: {}", .0.display())]
    InvalidDestination(PathBuf),
    #[error("download queue is not running")]
    Closed,
    #[error("cannot start download worker: {0}")]
    Worker(#[from] io::Error),
    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Accepts download submissions.
pub trait DownloadQueue {
    fn enqueue(&self, entry: DownloadEntry) -> Result<DownloadId, QueueError>;
}

type EventCallback = Arc<dyn Fn(DownloadEvent) + Send + Sync>;

struct Job {
    id: DownloadId,
    entry: DownloadEntry,
}

/// HTTP(S) download queue backed by `reqwest`.
pub struct HttpDownloadQueue {
    /// `None` once shutdown has started.
    sender: Option<mpsc::UnboundedSender<Job>>,
    next_id: Cell<u64>,
    worker: Option<JoinHandle<()>>,
}

impl HttpDownloadQueue {
    /// Starts the worker thread. `on_event` runs on the worker.
    pub fn start(on_event: impl Fn(DownloadEvent) + Send + Sync + 'static) -> Result<Self, QueueError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("download-worker")
            .enable_all()
            .build()?;
        let client = Client::builder().build()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let on_event: EventCallback = Arc::new(on_event);

        let worker = std::thread::Builder::new()
            .name("download-queue".to_string())
            .spawn(move || {
                runtime.block_on(dispatch(receiver, client, on_event));
                // Cancels running jobs; their temp files go with them.
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
                debug!("Download queue stopped");
            })?;

        Ok(Self {
            sender: Some(sender),
            next_id: Cell::new(1),
            worker: Some(worker),
        })
    }
}

impl Drop for HttpDownloadQueue {
    fn drop(&mut self) {
        // Closing the channel ends `dispatch`.
        self.sender.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("Download worker panicked");
        }
    }
}

impl DownloadQueue for HttpDownloadQueue {
    fn enqueue(&self, entry: DownloadEntry) -> Result<DownloadId, QueueError> {
        if !matches!(entry.url.scheme(), "http" | "https") {
            return Err(QueueError::UnsupportedScheme(entry.url.scheme().to_string()));
        }
        if entry.destination.file_name().is_none() {
            return Err(QueueError::InvalidDestination(entry.destination));
        }

        let id = DownloadId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        info!(
            id = id.0,
            url = %entry.url,
            destination = %entry.destination.display(),
            mime = entry.mime_type.as_deref().unwrap_or("-"),
            metered = entry.allow_metered,
            roaming = entry.allow_roaming,
            "Download queued"
        );

        self.sender
            .as_ref()
            .ok_or(QueueError::Closed)?
            .send(Job { id, entry })
            .map_err(|_| QueueError::Closed)?;
        Ok(id)
    }
}

async fn dispatch(mut receiver: mpsc::UnboundedReceiver<Job>, client: Client, on_event: EventCallback) {
    let slots = Arc::new(Semaphore::new(MAX_CONCURRENT_DOWNLOADS));

    while let Some(job) = receiver.recv().await {
        let client = client.clone();
        let on_event = on_event.clone();
        let slots = slots.clone();

        tokio::spawn(async move {
            let Ok(_permit) = slots.acquire_owned().await else {
                return;
            };
            let Job { id, entry } = job;
            let event = match fetch(&client, &entry).await {
                Ok(path) => {
                    info!(id = id.0, path = %path.display(), "Download complete");
                    DownloadEvent::Completed {
                        id,
                        title: entry.title,
                        path,
                        notify: entry.notify_on_completion,
                    }
                }
                Err(e) => {
                    error!(id = id.0, url = %entry.url, error = %e, "Download failed");
                    DownloadEvent::Failed {
                        id,
                        title: entry.title,
                        reason: e.to_string(),
                        notify: entry.notify_on_completion,
                    }
                }
            };
            on_event(event);
        });
    }
}

/// Streams the response into a fresh `.part` temp file, then renames it to
/// the first free destination name. The temp file is removed on any failure
/// and when the job is cancelled.
async fn fetch(client: &Client, entry: &DownloadEntry) -> Result<PathBuf, FetchError> {
    let dir = entry
        .destination
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let name = entry
        .destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    tokio::fs::create_dir_all(&dir).await?;
    let (file, partial) = storage::partial_file(&dir, &name)?.into_parts();
    let mut file = File::from_std(file);

    let mut request = client.get(entry.url.clone());
    for (header, value) in &entry.headers {
        request = request.header(header.as_str(), value.as_str());
    }
    let response = request.send().await?.error_for_status()?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    drop(file);

    Ok(storage::persist_unique(partial, &dir, &name)?)
}
