//! Debounce and status timers
//!
//! Both are driven by an explicit `now` so callers own the clock. Nothing
//! here spawns threads or sleeps.

use std::time::{Duration, Instant};

pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(150);
pub const STATUS_DISPLAY: Duration = Duration::from_secs(4);

/// A single pending-timer slot. Each trigger resets it; it fires once the
/// quiet window has elapsed since the last trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.pending = Some(now);
    }

    /// True exactly once per quiet period.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(at) if now.saturating_duration_since(at) >= self.window => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending slot would fire, if anything is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|at| at + self.window)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW)
    }
}

/// Latest user-facing status message, cleared after a fixed display time.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    current: Option<(String, Instant)>,
}

impl StatusBoard {
    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        self.current = Some((message.into(), now));
    }

    pub fn current(&self, now: Instant) -> Option<&str> {
        match &self.current {
            Some((message, shown)) if now.saturating_duration_since(*shown) < STATUS_DISPLAY => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}
