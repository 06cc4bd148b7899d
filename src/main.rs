//! Two-tab simulation of the idle-session policy.
//!
//! Tab A stays busy for a while and then goes quiet; tab B never receives
//! input. Both follow A's activity, warn together, and log out together.
//! Set `IDLE_WINDOW_SECS` / `IDLE_WARNING_SECS` to shorten the run.

use std::sync::Arc;
use std::time::Duration;

use session_idle::{
    ActivitySignal, AuthStore, IdleConfig, LogNavigator, SessionController, SessionState, StorageHub,
    SystemClock, User,
};
use tracing::info;

const BUSY_ROUNDS: u32 = 3;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = IdleConfig::from_env().expect("invalid idle configuration");
    let hub = StorageHub::new();
    let tab_a = hub.open_tab();
    let tab_b = hub.open_tab();

    let auth_a = AuthStore::new(Arc::new(tab_a.clone()), config.keys.clone());
    let auth_b = AuthStore::new(Arc::new(tab_b.clone()), config.keys.clone());
    auth_a.sign_in(&demo_user()).expect("sign-in record");

    let mut a = SessionController::new(
        config.clone(),
        Arc::new(tab_a),
        Arc::new(SystemClock),
        Arc::new(auth_a),
        Arc::new(LogNavigator),
    );
    let mut b = SessionController::new(
        config.clone(),
        Arc::new(tab_b),
        Arc::new(SystemClock),
        Arc::new(auth_b),
        Arc::new(LogNavigator),
    );
    a.start_monitoring().expect("tab A has a session");
    b.start_monitoring().expect("tab B shares the session");

    let step = (config.idle_window / 2).max(Duration::from_millis(1));
    for round in 1..=BUSY_ROUNDS {
        tokio::time::sleep(step).await;
        a.activity(ActivitySignal::KeyDown);
        info!(round, "tab A typed");
    }

    let mut views = b.subscribe();
    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        match view.state {
            SessionState::Warning { .. } => info!(countdown = %view.countdown_display, "tab B warning"),
            SessionState::LoggedOut => break,
            SessionState::Active => info!("tab B active"),
        }
    }

    // Tab B's task may finish first; give tab A's peer-logout a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!(tab_a = ?a.state(), tab_b = ?b.state(), "simulation finished");
    a.destroy();
    b.destroy();
}

fn demo_user() -> User {
    User {
        user_id: "demo".to_owned(),
        email: "demo@example.com".to_owned(),
        first_name: "Demo".to_owned(),
        last_name: "Shopper".to_owned(),
        token: "demo-token".to_owned(),
        expires_at: "2099-01-01T00:00:00Z".to_owned(),
        is_admin: false,
    }
}
