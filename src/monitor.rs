//! Idle-session state machine.
//!
//! ARCHITECTURE
//! ============
//! `IdleMonitor` is sans-IO apart from the shared activity record: every input
//! carries `now_ms`, and pending work is exposed as absolute deadlines through
//! [`IdleMonitor::next_deadline`]. The controller owns the timers; this type
//! owns the transitions.
//!
//! ```text
//! Active --idle window elapsed--> Warning --countdown zero | combined elapsed--> LoggedOut
//! Warning --extend | activity | peer activity--> Active
//! any --explicit logout | peer logout--> LoggedOut
//! ```
//!
//! DESIGN
//! ======
//! Expiry is always re-derived from the stored timestamp (on start, on idle
//! expiry, on visibility resume) rather than trusted from in-memory timers,
//! because a backgrounded tab may be suspended far longer than any timer.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::activity::{ActivitySignal, ActivityClock, Throttle, parse_timestamp};
use crate::config::IdleConfig;
use crate::countdown::{Tick, WarningCountdown, format_remaining};
use crate::storage::{SharedStorage, StorageEvent};

/// Observable session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Warning { remaining_secs: u32 },
    LoggedOut,
}

/// Page visibility as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Why a session ended. Returned once per monitoring run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user chose to log out.
    Explicit,
    /// The warning countdown reached zero.
    CountdownExpired,
    /// The stored timestamp shows the combined timeout already elapsed.
    SessionExpired,
    /// Another tab cleared the current-user record.
    PeerLogout,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit",
            Self::CountdownExpired => "countdown_expired",
            Self::SessionExpired => "session_expired",
            Self::PeerLogout => "peer_logout",
        })
    }
}

/// Presentation snapshot for a warning dialog.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub state: SessionState,
    pub warning_visible: bool,
    pub countdown_seconds: u32,
    pub countdown_display: String,
    /// Fraction of the warning left, in `[0, 1]`.
    pub progress: f64,
}

impl SessionView {
    #[must_use]
    pub fn new(state: SessionState, warning_secs: u32) -> Self {
        let countdown_seconds = match state {
            SessionState::Warning { remaining_secs } => remaining_secs,
            SessionState::Active | SessionState::LoggedOut => warning_secs,
        };
        let progress = if warning_secs == 0 {
            0.0
        } else {
            (f64::from(countdown_seconds) / f64::from(warning_secs)).clamp(0.0, 1.0)
        };
        Self {
            state,
            warning_visible: matches!(state, SessionState::Warning { .. }),
            countdown_seconds,
            countdown_display: format_remaining(countdown_seconds),
            progress,
        }
    }
}

/// Where the stored timestamp places the session at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Active { idle_deadline: i64 },
    Warning { remaining_secs: u32 },
    Expired,
}

pub struct IdleMonitor {
    idle_window_ms: i64,
    combined_ms: i64,
    warning_secs: u32,
    current_user_key: String,
    activity: ActivityClock,
    throttle: Throttle,
    countdown: WarningCountdown,
    idle_deadline: Option<i64>,
    monitoring: bool,
    logged_out: bool,
}

impl IdleMonitor {
    #[must_use]
    pub fn new(config: &IdleConfig, storage: Arc<dyn SharedStorage>) -> Self {
        Self {
            idle_window_ms: config.idle_window_ms(),
            combined_ms: config.combined_timeout_ms(),
            warning_secs: config.warning_secs(),
            current_user_key: config.keys.current_user.clone(),
            activity: ActivityClock::new(storage, config.keys.activity.clone()),
            throttle: Throttle::new(config.throttle_ms()),
            countdown: WarningCountdown::new(),
            idle_deadline: None,
            monitoring: false,
            logged_out: false,
        }
    }

    // =========================================================================
    // INPUTS
    // =========================================================================

    /// Begin monitoring. A second call while running is a no-op.
    ///
    /// The prior timestamp is read before recording so a session that went
    /// idle while no tab was open is caught at load time. Resuming into a
    /// warning leaves the stale record alone; recording first would reset the
    /// elapsed time the check depends on.
    #[must_use]
    pub fn start(&mut self, now_ms: i64) -> Option<LogoutReason> {
        if self.monitoring || self.logged_out {
            return None;
        }
        self.monitoring = true;
        match self.phase_at(now_ms) {
            Some(Phase::Expired) => self.logout(LogoutReason::SessionExpired),
            Some(Phase::Warning { remaining_secs }) => {
                self.enter_warning(remaining_secs, now_ms);
                None
            }
            Some(Phase::Active { .. }) | None => {
                self.touch(now_ms);
                None
            }
        }
    }

    /// Process one input signal, subject to the throttle.
    pub fn activity(&mut self, signal: ActivitySignal, now_ms: i64) {
        if !self.is_running() || !self.throttle.admit(now_ms) {
            return;
        }
        debug!(%signal, now_ms, "activity admitted");
        self.touch(now_ms);
    }

    /// Extend the session: clear any warning and restart the idle wait.
    pub fn stay_logged_in(&mut self, now_ms: i64) {
        if !self.is_running() {
            return;
        }
        info!(now_ms, "session extended");
        self.throttle.reset();
        self.touch(now_ms);
    }

    /// Fire whatever timers are due at `now_ms`.
    #[must_use]
    pub fn poll(&mut self, now_ms: i64) -> Option<LogoutReason> {
        if !self.is_running() {
            return None;
        }
        while let Some(tick) = self.countdown.tick_if_due(now_ms) {
            if tick == Tick::Expired {
                return self.logout(LogoutReason::CountdownExpired);
            }
        }
        if self.idle_deadline.is_some_and(|deadline| deadline <= now_ms) {
            self.idle_deadline = None;
            match self.phase_at(now_ms) {
                Some(Phase::Expired) => return self.logout(LogoutReason::SessionExpired),
                Some(Phase::Warning { remaining_secs }) => self.enter_warning(remaining_secs, now_ms),
                Some(Phase::Active { idle_deadline }) => {
                    debug!(idle_deadline, "peer activity postponed idle wait");
                    self.idle_deadline = Some(idle_deadline);
                }
                None => self.enter_warning(self.warning_secs, now_ms),
            }
        }
        None
    }

    /// React to a change written by another tab.
    #[must_use]
    pub fn storage_event(&mut self, event: &StorageEvent, now_ms: i64) -> Option<LogoutReason> {
        if !self.is_running() {
            return None;
        }
        if event.key == self.activity.key() {
            let Some(raw) = event.new_value.as_deref() else {
                return None;
            };
            let peer_ts = parse_timestamp(raw).map_or(now_ms, |ts| ts.min(now_ms));
            debug!(peer_ts, "peer activity observed");
            if self.countdown.is_running() {
                info!("idle warning cleared by peer activity");
                self.countdown.stop();
            }
            self.idle_deadline = Some(peer_ts.saturating_add(self.idle_window_ms));
            return None;
        }
        if event.key == self.current_user_key && event.new_value.is_none() {
            return self.logout(LogoutReason::PeerLogout);
        }
        None
    }

    /// Re-derive state when the tab is shown again.
    #[must_use]
    pub fn visibility(&mut self, visibility: Visibility, now_ms: i64) -> Option<LogoutReason> {
        if visibility == Visibility::Hidden || !self.is_running() {
            return None;
        }
        match self.phase_at(now_ms)? {
            Phase::Expired => self.logout(LogoutReason::SessionExpired),
            Phase::Warning { remaining_secs } => {
                self.enter_warning(remaining_secs, now_ms);
                None
            }
            Phase::Active { .. } => {
                self.touch(now_ms);
                None
            }
        }
    }

    /// End the session. Returns the reason only on the first call.
    #[must_use]
    pub fn logout(&mut self, reason: LogoutReason) -> Option<LogoutReason> {
        if self.logged_out {
            return None;
        }
        self.logged_out = true;
        self.countdown.stop();
        self.idle_deadline = None;
        self.activity.clear();
        info!(%reason, "session logged out");
        Some(reason)
    }

    /// Stop monitoring and drop every pending deadline.
    pub fn destroy(&mut self) {
        self.monitoring = false;
        self.countdown.stop();
        self.idle_deadline = None;
        self.throttle.reset();
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Earliest instant at which [`IdleMonitor::poll`] has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<i64> {
        if !self.is_running() {
            return None;
        }
        match (self.idle_deadline, self.countdown.next_tick_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.logged_out {
            return SessionState::LoggedOut;
        }
        match self.countdown.remaining() {
            Some(remaining_secs) => SessionState::Warning { remaining_secs },
            None => SessionState::Active,
        }
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView::new(self.state(), self.warning_secs)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.monitoring && !self.logged_out
    }

    #[must_use]
    pub fn is_logged_out(&self) -> bool {
        self.logged_out
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn touch(&mut self, now_ms: i64) {
        self.activity.record(now_ms);
        if self.countdown.is_running() {
            info!("idle warning cleared");
            self.countdown.stop();
        }
        self.idle_deadline = Some(now_ms.saturating_add(self.idle_window_ms));
    }

    fn enter_warning(&mut self, remaining_secs: u32, now_ms: i64) {
        self.idle_deadline = None;
        self.countdown.start(remaining_secs, now_ms);
        info!(remaining_secs, "idle warning shown");
    }

    /// Timestamps ahead of `now_ms` are read as `now_ms`.
    fn phase_at(&self, now_ms: i64) -> Option<Phase> {
        let last = self.activity.last()?.min(now_ms);
        let elapsed = now_ms.saturating_sub(last);
        if elapsed >= self.combined_ms {
            Some(Phase::Expired)
        } else if elapsed >= self.idle_window_ms {
            let left_ms = self.combined_ms - elapsed;
            let remaining_secs = u32::try_from((left_ms + 999) / 1000).unwrap_or(self.warning_secs);
            Some(Phase::Warning { remaining_secs })
        } else {
            Some(Phase::Active { idle_deadline: last.saturating_add(self.idle_window_ms) })
        }
    }
}

#[cfg(test)]
#[path = "monitor_test.rs"]
mod tests;
