//! Activity signals, throttling, and the shared activity clock.
//!
//! DESIGN
//! ======
//! Hosts forward heterogeneous input events; `ActivitySignal::from_event_name`
//! folds them into one value type and `Throttle` collapses bursts to at most
//! one admitted signal per window (leading edge, trailing signals dropped).
//! `ActivityClock` is the only writer of the last-activity timestamp.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::storage::SharedStorage;

/// Input events treated as evidence that the user is present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivitySignal {
    PointerMove,
    PointerDown,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl ActivitySignal {
    pub const ALL: [Self; 6] = [
        Self::PointerMove,
        Self::PointerDown,
        Self::KeyDown,
        Self::Scroll,
        Self::TouchStart,
        Self::Click,
    ];

    /// DOM event name this signal is subscribed under.
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            Self::PointerMove => "mousemove",
            Self::PointerDown => "mousedown",
            Self::KeyDown => "keydown",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
        }
    }

    /// Map a DOM event name to a signal; other events are not activity.
    #[must_use]
    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.event_name() == name)
    }
}

impl fmt::Display for ActivitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Leading-edge throttle over millisecond timestamps.
#[derive(Debug, Clone)]
pub struct Throttle {
    window_ms: i64,
    last_admitted: Option<i64>,
}

impl Throttle {
    #[must_use]
    pub fn new(window_ms: i64) -> Self {
        Self { window_ms, last_admitted: None }
    }

    /// Admit the signal at `now_ms` unless one was admitted within the window.
    pub fn admit(&mut self, now_ms: i64) -> bool {
        if let Some(last) = self.last_admitted {
            if now_ms.saturating_sub(last) < self.window_ms {
                return false;
            }
        }
        self.last_admitted = Some(now_ms);
        true
    }

    /// Forget the last admission so the next signal passes immediately.
    pub fn reset(&mut self) {
        self.last_admitted = None;
    }
}

/// Reads and writes the last-activity timestamp in shared storage.
#[derive(Clone)]
pub struct ActivityClock {
    storage: Arc<dyn SharedStorage>,
    key: String,
}

impl ActivityClock {
    #[must_use]
    pub fn new(storage: Arc<dyn SharedStorage>, key: impl Into<String>) -> Self {
        Self { storage, key: key.into() }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Store `now_ms` as the latest activity. Sibling tabs are notified.
    pub fn record(&self, now_ms: i64) {
        self.storage.set(&self.key, &now_ms.to_string());
    }

    /// Last recorded activity, or `None` when absent or unreadable.
    #[must_use]
    pub fn last(&self) -> Option<i64> {
        let raw = self.storage.get(&self.key)?;
        parse_timestamp(&raw).or_else(|| {
            warn!(key = %self.key, value = %raw, "ignoring malformed activity timestamp");
            None
        })
    }

    pub fn clear(&self) {
        self.storage.remove(&self.key);
    }
}

/// Parse a stored epoch-millisecond timestamp.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

#[cfg(test)]
#[path = "activity_test.rs"]
mod tests;
