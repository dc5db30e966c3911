//! File picker bridge.
//!
//! A page `<input type="file">` asks the host for a file. The surface hands
//! over a one-shot callback; the host opens a native dialog and, later,
//! resolves the callback with the selection.
//!
//! ```text
//!   idle ──request()──► awaiting-result ──on_result()──► idle
//!     ▲                      │
//!     └── launch failure ────┘  (callback resolved with "no selection")
//! ```
//!
//! At most one callback is pending. A second request resolves the first
//! with "no selection" before taking its place, so the page never waits on
//! a callback nobody will answer.

use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::notice::{Notice, Notifier};

/// Identifies one chooser launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChooserTicket(pub u64);

/// What the page asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChooserRequest {
    /// Accepted extensions without the leading dot. Empty means any file.
    pub extensions: Vec<String>,
}

/// Result reported by a chooser once the user is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChooserOutcome {
    pub ticket: ChooserTicket,
    pub success: bool,
    pub selection: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ChooserLaunchError {
    #[error("chooser thread could not be started: {0}")]
    Spawn(#[from] io::Error),
    #[error("no chooser available")]
    Unavailable,
}

/// The surface side of a file input: resolved exactly once.
pub trait FileChooserCallback {
    /// `None` means nothing was selected.
    fn resolve(self, selection: Option<Vec<PathBuf>>);
}

/// Opens a chooser without blocking the caller. The outcome is delivered
/// later, tagged with `ticket`.
pub trait ChooserLauncher {
    fn launch(&self, ticket: ChooserTicket, request: ChooserRequest)
    -> Result<(), ChooserLaunchError>;
}

/// Single-slot correlation between file inputs and chooser results.
pub struct FilePickerBridge<C: FileChooserCallback> {
    pending: Option<(ChooserTicket, C)>,
    next_ticket: u64,
    launcher: Box<dyn ChooserLauncher>,
    notifier: Rc<dyn Notifier>,
}

impl<C: FileChooserCallback> FilePickerBridge<C> {
    pub fn new(launcher: Box<dyn ChooserLauncher>, notifier: Rc<dyn Notifier>) -> Self {
        Self {
            pending: None,
            next_ticket: 1,
            launcher,
            notifier,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes ownership of `callback` and opens a chooser for it. Returns
    /// `false` if the chooser could not be opened (the callback has then
    /// already been resolved with "no selection").
    pub fn request(&mut self, callback: C, request: ChooserRequest) -> bool {
        if let Some((ticket, previous)) = self.pending.take() {
            debug!(ticket = ticket.0, "Superseding pending file chooser");
            previous.resolve(None);
        }

        let ticket = ChooserTicket(self.next_ticket);
        self.next_ticket += 1;

        match self.launcher.launch(ticket, request) {
            Ok(()) => {
                debug!(ticket = ticket.0, "File chooser launched");
                self.pending = Some((ticket, callback));
                true
            }
            Err(e) => {
                error!(error = %e, "Cannot open file chooser");
                callback.resolve(None);
                self.notifier.notify(Notice::long("Cannot open file chooser"));
                false
            }
        }
    }

    /// Resolves the pending callback with a chooser's outcome. Outcomes
    /// from superseded launches are dropped.
    pub fn on_result(&mut self, outcome: ChooserOutcome) {
        let Some((ticket, callback)) = self.pending.take() else {
            debug!(ticket = outcome.ticket.0, "Chooser result with nothing pending");
            return;
        };
        if ticket != outcome.ticket {
            debug!(
                expected = ticket.0,
                got = outcome.ticket.0,
                "Ignoring stale chooser result"
            );
            self.pending = Some((ticket, callback));
            return;
        }

        match outcome.selection.filter(|_| outcome.success) {
            Some(path) => {
                info!(path = %path.display(), "File selected");
                callback.resolve(Some(vec![path]));
            }
            None => callback.resolve(None),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native dialog
// ─────────────────────────────────────────────────────────────────────────────

/// Opens an `rfd` dialog and hands the outcome to `report`, which posts it
/// back to the event loop.
///
/// The dialog is created on the caller's thread (the event-loop thread,
/// which macOS requires) and awaited on a helper thread, so the loop keeps
/// running while the dialog is open.
#[derive(Clone)]
pub struct RfdLauncher {
    report: Arc<dyn Fn(ChooserOutcome) + Send + Sync>,
}

impl RfdLauncher {
    pub fn new(report: impl Fn(ChooserOutcome) + Send + Sync + 'static) -> Self {
        Self {
            report: Arc::new(report),
        }
    }
}

impl ChooserLauncher for RfdLauncher {
    fn launch(
        &self,
        ticket: ChooserTicket,
        request: ChooserRequest,
    ) -> Result<(), ChooserLaunchError> {
        let mut dialog = rfd::AsyncFileDialog::new().set_title("Choose a file");
        if !request.extensions.is_empty() {
            dialog = dialog.add_filter("Accepted files", &request.extensions[..]);
        }
        let picking = dialog.pick_file();

        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let report = Arc::clone(&self.report);
        std::thread::Builder::new()
            .name("file-chooser".into())
            .spawn(move || {
                let selection = runtime
                    .block_on(picking)
                    .map(|handle| handle.path().to_path_buf());
                report(chooser_outcome(ticket, selection));
            })?;
        Ok(())
    }
}

/// A closed dialog with no file counts as "no selection".
fn chooser_outcome(ticket: ChooserTicket, selection: Option<PathBuf>) -> ChooserOutcome {
    ChooserOutcome {
        ticket,
        success: selection.is_some(),
        selection,
    }
}

/// Extensions from `accept`-style patterns (`.pdf`, `*.epub`, `txt`).
/// MIME patterns such as `image/*` are skipped.
pub fn extensions_from_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    patterns
        .into_iter()
        .map(|p| p.trim().trim_start_matches('*').trim_start_matches('.'))
        .filter(|p| !p.is_empty() && !p.contains('/'))
        .map(str::to_ascii_lowercase)
        .collect()
}
