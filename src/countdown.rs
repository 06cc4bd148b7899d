//! Warning countdown: one cancellable once-per-second ticker.
//!
//! The ticker lives in an `Option` slot, so starting a countdown always
//! replaces whatever ticker was running and there is never more than one.

const TICK_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticker {
    remaining: u32,
    next_tick_at: i64,
}

/// Result of a due tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Seconds left after this tick.
    Remaining(u32),
    /// The countdown reached zero and stopped itself.
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct WarningCountdown {
    ticker: Option<Ticker>,
}

impl WarningCountdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the countdown at `remaining` seconds.
    pub fn start(&mut self, remaining: u32, now_ms: i64) {
        self.ticker = Some(Ticker { remaining, next_tick_at: now_ms + TICK_MS });
    }

    /// Cancel the ticker. Safe when none is running.
    pub fn stop(&mut self) {
        self.ticker = None;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.ticker.map(|t| t.remaining)
    }

    #[must_use]
    pub fn next_tick_at(&self) -> Option<i64> {
        self.ticker.map(|t| t.next_tick_at)
    }

    /// Fire the next tick if it is due at `now_ms`.
    pub fn tick_if_due(&mut self, now_ms: i64) -> Option<Tick> {
        let ticker = self.ticker.as_mut()?;
        if now_ms < ticker.next_tick_at {
            return None;
        }
        let remaining = ticker.remaining.saturating_sub(1);
        if remaining == 0 {
            self.ticker = None;
            return Some(Tick::Expired);
        }
        ticker.remaining = remaining;
        ticker.next_tick_at += TICK_MS;
        Some(Tick::Remaining(remaining))
    }
}

/// Human-readable countdown: `M:SS` from one minute up, `Ns` below.
#[must_use]
pub fn format_remaining(secs: u32) -> String {
    let minutes = secs / 60;
    let seconds = secs % 60;
    if minutes > 0 {
        format!("{minutes}:{seconds:02}")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
#[path = "countdown_test.rs"]
mod tests;
