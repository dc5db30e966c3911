//! Download interception.
//!
//! The surface reports a [`DownloadRequest`] whenever a main-frame load turns
//! out to be a file rather than a page (see [`detect`]). The
//! [`DownloadInterceptor`] applies the policy, in order:
//!
//! 1. offline → notice, abort;
//! 2. `blob:` / `data:` → notice pointing at the script bridge, abort;
//! 3. otherwise → guess a file name, enqueue, notice.
//!
//! Nothing in here is fatal: every failure ends as a notice and a log line.

pub mod detect;
pub mod filename;
pub mod queue;

use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, error, info};
use url::Url;

use crate::connectivity::Connectivity;
use crate::notice::{Notice, Notifier};
use self::filename::guess_file_name;
use self::queue::{DownloadEntry, DownloadId, DownloadQueue};

/// Schemes the queue cannot fetch by reference.
const IN_MEMORY_SCHEMES: &[&str] = &["blob", "data"];

/// A browser-initiated download, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub user_agent: String,
    pub content_disposition: Option<String>,
    pub mime_type: Option<String>,
    pub content_length: Option<u64>,
}

/// What the interceptor did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Enqueued { id: DownloadId, file_name: String },
    Offline,
    UnsupportedScheme,
    Failed { reason: String },
}

/// Queue-level settings applied to every entry.
#[derive(Debug, Clone)]
pub struct DownloadPolicy {
    pub destination_dir: PathBuf,
    pub notify_on_completion: bool,
    pub allow_metered: bool,
    pub allow_roaming: bool,
}

/// Routes browser downloads to the managed queue.
pub struct DownloadInterceptor {
    connectivity: Rc<dyn Connectivity>,
    queue: Box<dyn DownloadQueue>,
    notifier: Rc<dyn Notifier>,
    policy: DownloadPolicy,
}

impl DownloadInterceptor {
    pub fn new(
        connectivity: Rc<dyn Connectivity>,
        queue: Box<dyn DownloadQueue>,
        notifier: Rc<dyn Notifier>,
        policy: DownloadPolicy,
    ) -> Self {
        Self {
            connectivity,
            queue,
            notifier,
            policy,
        }
    }

    pub fn on_download_requested(&self, request: &DownloadRequest) -> DownloadOutcome {
        debug!(
            url = %request.url,
            mime = request.mime_type.as_deref().unwrap_or("-"),
            disposition = request.content_disposition.as_deref().unwrap_or("-"),
            "Download requested"
        );

        if !self.connectivity.is_connected() {
            self.notifier.notify(Notice::short("No network connection"));
            return DownloadOutcome::Offline;
        }

        if is_in_memory_url(&request.url) {
            self.notifier.notify(Notice::long(
                "Special URLs are handled via JavaScript interface",
            ));
            return DownloadOutcome::UnsupportedScheme;
        }

        let file_name = guess_file_name(
            &request.url,
            request.content_disposition.as_deref(),
            request.mime_type.as_deref(),
        );
        let entry = self.entry_for(request, &file_name);

        match self.queue.enqueue(entry) {
            Ok(id) => {
                info!(id = id.0, file_name, "Download started");
                self.notifier
                    .notify(Notice::short(format!("Downloading {file_name}")));
                DownloadOutcome::Enqueued { id, file_name }
            }
            Err(e) => {
                error!(url = %request.url, error = %e, "Download submission failed");
                let reason = e.to_string();
                self.notifier
                    .notify(Notice::long(format!("Download failed: {reason}")));
                DownloadOutcome::Failed { reason }
            }
        }
    }

    fn entry_for(&self, request: &DownloadRequest, file_name: &str) -> DownloadEntry {
        let mut headers = Vec::new();
        if !request.user_agent.is_empty() {
            headers.push(("User-Agent".to_string(), request.user_agent.clone()));
        }

        DownloadEntry {
            url: request.url.clone(),
            mime_type: request.mime_type.clone(),
            headers,
            title: file_name.to_string(),
            description: "Downloading file...".to_string(),
            destination: self.policy.destination_dir.join(file_name),
            notify_on_completion: self.policy.notify_on_completion,
            allow_metered: self.policy.allow_metered,
            allow_roaming: self.policy.allow_roaming,
        }
    }
}

/// `blob:` and `data:` URLs only exist inside the page.
pub fn is_in_memory_url(url: &Url) -> bool {
    IN_MEMORY_SCHEMES.contains(&url.scheme())
}
