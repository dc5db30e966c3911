//! Handlers the browser surface calls into.
//!
//! The Servo delegate in [`crate::servo_glue`] only translates engine
//! callbacks; every decision is made here, behind [`HostHandlers`], so the
//! whole host can be driven without a window or an engine.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{info, warn};

use crate::download::queue::DownloadEvent;
use crate::download::{DownloadInterceptor, DownloadOutcome, DownloadRequest};
use crate::file_picker::{
    ChooserLauncher, ChooserOutcome, ChooserRequest, FileChooserCallback, FilePickerBridge,
};
use crate::notice::{Notice, Notifier};
use crate::script_bridge::{ScriptBridge, ScriptCall};

/// Capabilities the browser surface needs from its host.
pub trait HostHandlers<C: FileChooserCallback> {
    fn on_file_chooser_requested(&self, callback: C, request: ChooserRequest);
    fn on_download_requested(&self, request: &DownloadRequest) -> DownloadOutcome;
    fn on_page_script_call(&self, call: ScriptCall);
}

/// The reader's handlers: file picker, download interceptor, script bridge.
pub struct ReaderHandlers<C: FileChooserCallback> {
    file_picker: RefCell<FilePickerBridge<C>>,
    downloads: DownloadInterceptor,
    script_bridge: ScriptBridge,
    notifier: Rc<dyn Notifier>,
}

impl<C: FileChooserCallback> ReaderHandlers<C> {
    pub fn new(
        launcher: Box<dyn ChooserLauncher>,
        downloads: DownloadInterceptor,
        script_bridge: ScriptBridge,
        notifier: Rc<dyn Notifier>,
    ) -> Self {
        Self {
            file_picker: RefCell::new(FilePickerBridge::new(launcher, notifier.clone())),
            downloads,
            script_bridge,
            notifier,
        }
    }

    /// A chooser launched by [`HostHandlers::on_file_chooser_requested`]
    /// has finished.
    pub fn on_chooser_result(&self, outcome: ChooserOutcome) {
        self.file_picker.borrow_mut().on_result(outcome);
    }

    /// A queued download has finished.
    pub fn on_download_event(&self, event: DownloadEvent) {
        match event {
            DownloadEvent::Completed {
                id,
                title,
                path,
                notify,
            } => {
                info!(id = id.0, path = %path.display(), "Download complete");
                if notify {
                    self.notifier
                        .notify(Notice::short(format!("Download complete: {title}")));
                }
            }
            DownloadEvent::Failed {
                id,
                title,
                reason,
                notify,
            } => {
                warn!(id = id.0, title, reason, "Download failed");
                if notify {
                    self.notifier
                        .notify(Notice::long(format!("Download failed: {reason}")));
                }
            }
        }
    }

    pub fn is_awaiting_chooser(&self) -> bool {
        self.file_picker.borrow().is_awaiting()
    }
}

impl<C: FileChooserCallback> HostHandlers<C> for ReaderHandlers<C> {
    fn on_file_chooser_requested(&self, callback: C, request: ChooserRequest) {
        self.file_picker.borrow_mut().request(callback, request);
    }

    fn on_download_requested(&self, request: &DownloadRequest) -> DownloadOutcome {
        self.downloads.on_download_requested(request)
    }

    fn on_page_script_call(&self, call: ScriptCall) {
        self.script_bridge.on_page_script_call(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use url::Url;

    use crate::connectivity::FixedConnectivity;
    use crate::download::DownloadPolicy;
    use crate::download::queue::{DownloadEntry, DownloadId, DownloadQueue, QueueError};
    use crate::file_picker::{ChooserLaunchError, ChooserTicket};
    use crate::notice::RecordingNotifier;
    use crate::script_bridge::PushedFile;

    struct CountingQueue(Rc<RefCell<Vec<DownloadEntry>>>);

    impl DownloadQueue for CountingQueue {
        fn enqueue(&self, entry: DownloadEntry) -> Result<DownloadId, QueueError> {
            self.0.borrow_mut().push(entry);
            Ok(DownloadId(self.0.borrow().len() as u64))
        }
    }

    struct TicketLauncher(Rc<RefCell<Vec<ChooserTicket>>>);

    impl ChooserLauncher for TicketLauncher {
        fn launch(
            &self,
            ticket: ChooserTicket,
            _request: ChooserRequest,
        ) -> Result<(), ChooserLaunchError> {
            self.0.borrow_mut().push(ticket);
            Ok(())
        }
    }

    struct Slot(Rc<RefCell<Option<Option<Vec<PathBuf>>>>>);

    impl FileChooserCallback for Slot {
        fn resolve(self, selection: Option<Vec<PathBuf>>) {
            *self.0.borrow_mut() = Some(selection);
        }
    }

    struct Harness {
        handlers: ReaderHandlers<Slot>,
        queued: Rc<RefCell<Vec<DownloadEntry>>>,
        tickets: Rc<RefCell<Vec<ChooserTicket>>>,
        notifier: Rc<RecordingNotifier>,
        dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let queued = Rc::new(RefCell::new(Vec::new()));
        let tickets = Rc::new(RefCell::new(Vec::new()));
        let notifier = Rc::new(RecordingNotifier::new());
        let downloads = DownloadInterceptor::new(
            Rc::new(FixedConnectivity(true)),
            Box::new(CountingQueue(queued.clone())),
            notifier.clone(),
            DownloadPolicy {
                destination_dir: dir.path().to_path_buf(),
                notify_on_completion: true,
                allow_metered: true,
                allow_roaming: true,
            },
        );
        let script_bridge = ScriptBridge::new(dir.path().to_path_buf(), notifier.clone());
        Harness {
            handlers: ReaderHandlers::new(
                Box::new(TicketLauncher(tickets.clone())),
                downloads,
                script_bridge,
                notifier.clone(),
            ),
            queued,
            tickets,
            notifier,
            dir,
        }
    }

    #[test]
    fn test_download_request_reaches_queue() {
        let h = harness();
        let request = DownloadRequest {
            url: Url::parse("https://example.com/books/guide.epub").unwrap(),
            user_agent: String::new(),
            content_disposition: None,
            mime_type: Some("application/epub+zip".to_string()),
            content_length: None,
        };
        assert!(matches!(
            h.handlers.on_download_requested(&request),
            DownloadOutcome::Enqueued { .. }
        ));
        assert_eq!(h.queued.borrow().len(), 1);
        assert_eq!(h.notifier.messages(), vec!["Downloading guide.epub"]);
    }

    #[test]
    fn test_page_script_call_writes_file() {
        let h = harness();
        h.handlers.on_page_script_call(ScriptCall::PushFile(PushedFile {
            file_name: "progress.json".to_string(),
            payload: "eyJwYWdlIjo0Mn0=".to_string(),
            mime_type: "application/json".to_string(),
        }));
        assert_eq!(
            std::fs::read_to_string(h.dir.path().join("progress.json")).unwrap(),
            r#"{"page":42}"#
        );
        assert_eq!(h.notifier.messages(), vec!["File saved: progress.json"]);
    }

    #[test]
    fn test_chooser_roundtrip() {
        let h = harness();
        let slot = Rc::new(RefCell::new(None));
        h.handlers
            .on_file_chooser_requested(Slot(slot.clone()), ChooserRequest::default());
        assert!(h.handlers.is_awaiting_chooser());

        let ticket = h.tickets.borrow()[0];
        h.handlers.on_chooser_result(ChooserOutcome {
            ticket,
            success: true,
            selection: Some(PathBuf::from("/tmp/notes.txt")),
        });
        assert!(!h.handlers.is_awaiting_chooser());
        assert_eq!(
            *slot.borrow(),
            Some(Some(vec![PathBuf::from("/tmp/notes.txt")]))
        );
    }

    #[test]
    fn test_download_events_respect_notify_flag() {
        let h = harness();
        h.handlers.on_download_event(DownloadEvent::Completed {
            id: DownloadId(1),
            title: "a.pdf".to_string(),
            path: PathBuf::from("/tmp/a.pdf"),
            notify: true,
        });
        h.handlers.on_download_event(DownloadEvent::Completed {
            id: DownloadId(2),
            title: "b.pdf".to_string(),
            path: PathBuf::from("/tmp/b.pdf"),
            notify: false,
        });
        h.handlers.on_download_event(DownloadEvent::Failed {
            id: DownloadId(3),
            title: "c.pdf".to_string(),
            reason: "HTTP 404".to_string(),
            notify: true,
        });
        assert_eq!(
            h.notifier.messages(),
            vec!["Download complete: a.pdf", "Download failed: HTTP 404"]
        );
    }
}
