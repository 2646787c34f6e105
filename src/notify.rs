//! Toast-style notices shown at the bottom of the window.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::ShellError;

/// How long a notice stays up unless stated otherwise.
pub const DEFAULT_NOTICE_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// `None` keeps the notice until the user dismisses it.
    pub timeout: Option<Duration>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Notice {
            level,
            message: message.into(),
            timeout: Some(DEFAULT_NOTICE_TIMEOUT),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn sticky(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// The notice a failed operation surfaces to the user.
    pub fn from_error(err: &ShellError) -> Self {
        match err {
            ShellError::Validation(_) => Notice::warning(err.to_string()),
            ShellError::DuplicateSingleInstance(_) => Notice::error(err.to_string()).sticky(),
            ShellError::UnsupportedPlatform(_) => Notice::warning(err.to_string()).sticky(),
            _ => Notice::error(err.to_string()),
        }
    }
}

/// Notices currently on screen, oldest first.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    entries: Vec<(Notice, Option<Instant>)>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice, now: Instant) {
        let expires = notice.timeout.map(|t| now + t);
        self.entries.push((notice, expires));
    }

    /// Remove the notice at `index`. Returns false when there is none.
    pub fn dismiss(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.entries.remove(index);
        true
    }

    /// Drop timed notices that are due. Returns whether anything was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|(_, expires)| expires.map_or(true, |at| at > now));
        self.entries.len() != before
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.entries.iter().filter_map(|(_, expires)| *expires).min()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.entries.iter().map(|(notice, _)| notice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
