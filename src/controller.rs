//! Session controller: drives one [`IdleMonitor`] with tokio timers.
//!
//! ARCHITECTURE
//! ============
//! User actions (`activity`, `stay_logged_in`, `perform_logout`,
//! `visibility`) run synchronously against the monitor under a short lock, so
//! callers observe the new state as soon as the call returns. A background
//! task owns the timers: it sleeps until the monitor's next deadline, wakes on
//! sibling-tab storage events, and is re-armed through a `Notify` whenever a
//! user action moves a deadline.
//!
//! LIFECYCLE
//! =========
//! `start_monitoring` → (`LoggedOut` | `destroy`). A logged-out or destroyed
//! run can be replaced by calling `start_monitoring` again after a new
//! sign-in. Dropping the controller destroys it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::activity::ActivitySignal;
use crate::auth::{Navigator, SessionAuth};
use crate::clock::Clock;
use crate::config::IdleConfig;
use crate::error::IdleError;
use crate::monitor::{IdleMonitor, LogoutReason, SessionState, SessionView, Visibility};
use crate::storage::{SharedStorage, StorageEvents};

/// Collaborators shared between the controller and its timer task.
struct Shared {
    config: IdleConfig,
    storage: Arc<dyn SharedStorage>,
    clock: Arc<dyn Clock>,
    auth: Arc<dyn SessionAuth>,
    navigator: Arc<dyn Navigator>,
    view: watch::Sender<SessionView>,
}

impl Shared {
    fn publish(&self, monitor: &IdleMonitor) {
        let next = monitor.view();
        self.view.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Side effects owned by the auth layer once the monitor has logged out.
    fn finish_logout(&self, reason: LogoutReason) {
        info!(%reason, route = %self.config.login_route, "invalidating session");
        self.auth.logout();
        self.navigator.navigate(&self.config.login_route);
    }
}

pub struct SessionController {
    shared: Arc<Shared>,
    monitor: Arc<Mutex<IdleMonitor>>,
    rearm: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        config: IdleConfig,
        storage: Arc<dyn SharedStorage>,
        clock: Arc<dyn Clock>,
        auth: Arc<dyn SessionAuth>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let monitor = IdleMonitor::new(&config, storage.clone());
        let (view, _) = watch::channel(monitor.view());
        Self {
            shared: Arc::new(Shared { config, storage, clock, auth, navigator, view }),
            monitor: Arc::new(Mutex::new(monitor)),
            rearm: Arc::new(Notify::new()),
            task: None,
        }
    }

    /// Begin idle tracking for the signed-in session.
    ///
    /// A no-op while a run is active. Must be called from within a tokio
    /// runtime, since it spawns the timer task.
    pub fn start_monitoring(&mut self) -> Result<(), IdleError> {
        let mut monitor = lock(&self.monitor);
        if monitor.is_running() {
            debug!("idle monitoring already running");
            return Ok(());
        }
        if !self.shared.auth.is_logged_in() {
            return Err(IdleError::NoSession);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if monitor.is_logged_out() {
            *monitor = IdleMonitor::new(&self.shared.config, self.shared.storage.clone());
        }

        // Subscribe before the first write so no sibling change is missed.
        let events = self.shared.storage.subscribe();
        let reason = monitor.start(self.shared.clock.now_ms());
        self.shared.publish(&monitor);
        drop(monitor);

        if let Some(reason) = reason {
            self.shared.finish_logout(reason);
            return Ok(());
        }

        info!(
            idle_window_secs = self.shared.config.idle_window.as_secs(),
            warning_secs = self.shared.config.warning_secs(),
            "idle monitoring started"
        );
        self.task = Some(tokio::spawn(run_timers(
            self.shared.clone(),
            self.monitor.clone(),
            self.rearm.clone(),
            events,
        )));
        Ok(())
    }

    /// Forward one input signal from the host.
    pub fn activity(&self, signal: ActivitySignal) {
        self.apply(|monitor, now| {
            monitor.activity(signal, now);
            None
        });
    }

    /// Forward a page-visibility change from the host.
    pub fn visibility(&self, visibility: Visibility) {
        self.apply(|monitor, now| monitor.visibility(visibility, now));
    }

    /// Dismiss the warning and restart the idle wait from zero.
    pub fn stay_logged_in(&self) {
        self.apply(|monitor, now| {
            monitor.stay_logged_in(now);
            None
        });
    }

    /// Log out now. Repeated calls have no further effect.
    pub fn perform_logout(&self) {
        self.apply(|monitor, _| monitor.logout(LogoutReason::Explicit));
    }

    /// Cancel the timer task and every pending deadline.
    ///
    /// Safe to call when monitoring never started, and more than once.
    pub fn destroy(&mut self) {
        lock(&self.monitor).destroy();
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("idle monitoring destroyed");
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.monitor).state()
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.shared.view.borrow().clone()
    }

    /// Watch stream of view changes for the presentation layer.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.view.subscribe()
    }

    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        lock(&self.monitor).is_running()
    }

    fn apply<F>(&self, f: F)
    where
        F: FnOnce(&mut IdleMonitor, i64) -> Option<LogoutReason>,
    {
        let reason = {
            let mut monitor = lock(&self.monitor);
            let reason = f(&mut *monitor, self.shared.clock.now_ms());
            self.shared.publish(&monitor);
            reason
        };
        self.rearm.notify_one();
        if let Some(reason) = reason {
            self.shared.finish_logout(reason);
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn lock(monitor: &Mutex<IdleMonitor>) -> MutexGuard<'_, IdleMonitor> {
    monitor.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Timer task: sleeps until the next deadline, reacts to sibling writes.
async fn run_timers(
    shared: Arc<Shared>,
    monitor: Arc<Mutex<IdleMonitor>>,
    rearm: Arc<Notify>,
    mut events: StorageEvents,
) {
    let mut storage_open = true;
    loop {
        let wait = {
            let guard = lock(&monitor);
            if !guard.is_running() {
                break;
            }
            guard
                .next_deadline()
                .map(|deadline| until(deadline, shared.clock.now_ms()))
        };

        let reason = tokio::select! {
            () = rearm.notified() => None,
            event = events.recv(), if storage_open => {
                match event {
                    Some(event) => {
                        let mut guard = lock(&monitor);
                        let reason = guard.storage_event(&event, shared.clock.now_ms());
                        shared.publish(&guard);
                        reason
                    }
                    None => {
                        storage_open = false;
                        None
                    }
                }
            }
            () = sleep_for(wait) => {
                let mut guard = lock(&monitor);
                let reason = guard.poll(shared.clock.now_ms());
                shared.publish(&guard);
                reason
            }
        };

        if let Some(reason) = reason {
            shared.finish_logout(reason);
            break;
        }
    }
    debug!("idle timer task finished");
}

fn until(deadline_ms: i64, now_ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(deadline_ms.saturating_sub(now_ms)).unwrap_or(0))
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
