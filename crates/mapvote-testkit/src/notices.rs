//! Notice recorder

use mapvote_core::{Notice, NoticeEffects};
use parking_lot::Mutex;

/// Collects every notice in delivery order.
#[derive(Debug, Default)]
pub struct RecordingNotices {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotices {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded
    pub fn all(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Drain everything recorded
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    /// Number of recorded notices matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Notice) -> bool) -> usize {
        self.notices.lock().iter().filter(|notice| predicate(notice)).count()
    }
}

impl NoticeEffects for RecordingNotices {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
