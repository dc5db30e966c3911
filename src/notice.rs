//! Transient user-visible notices.
//!
//! Every recoverable outcome in the host (download started, file saved,
//! offline, chooser failure…) is surfaced as a short [`Notice`] plus a log
//! line. The [`Notifier`] trait is the seam between the handlers and the
//! window: the running app shows notices in the window title, tests record
//! them.

use std::cell::RefCell;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

/// How long a notice stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeDuration {
    Short,
    Long,
}

impl NoticeDuration {
    /// Display time in seconds.
    pub fn seconds(self) -> u64 {
        match self {
            Self::Short => 2,
            Self::Long => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub duration: NoticeDuration,
}

impl Notice {
    pub fn short(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: NoticeDuration::Short,
        }
    }

    pub fn long(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: NoticeDuration::Long,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Surface that shows notices to the user.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Notifier that only writes the log line. Used before the window exists.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        info!(duration = ?notice.duration, "{}", notice.message);
    }
}

/// Notifier that keeps every notice, for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: RefCell<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices
            .borrow()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        info!(duration = ?notice.duration, "{}", notice.message);
        self.notices.borrow_mut().push(notice);
    }
}

/// Title text for a window that shows notices in front of the page title.
///
/// A notice replaces the previous one and is dropped once its duration has
/// elapsed; the caller polls [`NoticeBoard::expire`] from the event loop.
#[derive(Debug)]
pub struct NoticeBoard {
    app_name: String,
    page_title: Option<String>,
    current: Option<(Notice, Instant)>,
}

impl NoticeBoard {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            page_title: None,
            current: None,
        }
    }

    pub fn set_page_title(&mut self, title: Option<String>) {
        self.page_title = title.filter(|t| !t.trim().is_empty());
    }

    pub fn show(&mut self, notice: Notice, now: Instant) {
        let until = now + Duration::from_secs(notice.duration.seconds());
        self.current = Some((notice, until));
    }

    /// Drops the current notice if it has run out. Returns `true` when the
    /// title changed.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.current {
            Some((_, until)) if until <= now => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    /// When the current notice runs out, if one is shown.
    pub fn deadline(&self) -> Option<Instant> {
        self.current.as_ref().map(|(_, until)| *until)
    }

    pub fn title(&self) -> String {
        let base = match &self.page_title {
            Some(page) => format!("{page} — {}", self.app_name),
            None => self.app_name.clone(),
        };
        match &self.current {
            Some((notice, _)) => format!("[{}] {base}", notice.message),
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::short("first"));
        notifier.notify(Notice::long("second"));
        assert_eq!(notifier.messages(), vec!["first", "second"]);
        assert_eq!(
            notifier.last().map(|n| n.duration),
            Some(NoticeDuration::Long)
        );
    }

    #[test]
    fn test_long_notices_outlast_short_ones() {
        assert!(NoticeDuration::Long.seconds() > NoticeDuration::Short.seconds());
    }

    #[test]
    fn test_board_title_and_expiry() {
        let start = Instant::now();
        let mut board = NoticeBoard::new("Trial and Error Reading");
        assert_eq!(board.title(), "Trial and Error Reading");

        board.set_page_title(Some("Chapter 1".to_string()));
        board.show(Notice::short("File saved: a.txt"), start);
        assert_eq!(
            board.title(),
            "[File saved: a.txt] Chapter 1 — Trial and Error Reading"
        );
        assert_eq!(board.deadline(), Some(start + Duration::from_secs(2)));

        assert!(!board.expire(start + Duration::from_secs(1)));
        assert!(board.expire(start + Duration::from_secs(2)));
        assert_eq!(board.title(), "Chapter 1 — Trial and Error Reading");
        assert_eq!(board.deadline(), None);
    }

    #[test]
    fn test_newer_notice_replaces_older() {
        let start = Instant::now();
        let mut board = NoticeBoard::new("Reader");
        board.show(Notice::long("Cannot open file chooser"), start);
        board.show(Notice::short("Downloading a.pdf"), start + Duration::from_secs(1));
        assert_eq!(board.title(), "[Downloading a.pdf] Reader");
        assert_eq!(board.deadline(), Some(start + Duration::from_secs(3)));
    }

    #[test]
    fn test_blank_page_title_ignored() {
        let mut board = NoticeBoard::new("Reader");
        board.set_page_title(Some("   ".to_string()));
        assert_eq!(board.title(), "Reader");
    }
}
