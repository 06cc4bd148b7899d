use std::sync::{Mutex, MutexGuard, PoisonError};

use super::*;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// # Safety
/// Callers must hold `env_guard()` so env mutation is serialized.
unsafe fn clear_idle_env() {
    unsafe {
        std::env::remove_var("IDLE_WINDOW_SECS");
        std::env::remove_var("IDLE_WARNING_SECS");
        std::env::remove_var("IDLE_THROTTLE_MS");
        std::env::remove_var("IDLE_LOGIN_ROUTE");
    }
}

// =============================================================================
// defaults
// =============================================================================

#[test]
fn default_matches_contract_constants() {
    let cfg = IdleConfig::default();
    assert_eq!(cfg.idle_window, Duration::from_secs(14 * 60));
    assert_eq!(cfg.warning, Duration::from_secs(60));
    assert_eq!(cfg.combined_timeout(), Duration::from_secs(15 * 60));
    assert_eq!(cfg.throttle_ms(), 1000);
    assert_eq!(cfg.login_route, "/auth/login");
    assert_eq!(cfg.keys.activity, "tomato_last_activity");
    assert_eq!(cfg.keys.current_user, "tomato_current_user");
}

#[test]
fn millisecond_helpers_agree_with_durations() {
    let cfg = IdleConfig::default();
    assert_eq!(cfg.idle_window_ms(), 840_000);
    assert_eq!(cfg.combined_timeout_ms(), 900_000);
    assert_eq!(cfg.warning_secs(), 60);
}

// =============================================================================
// from_env
// =============================================================================

#[test]
fn from_env_uses_defaults_when_unset() {
    let _guard = env_guard();
    unsafe { clear_idle_env() };
    let cfg = IdleConfig::from_env().unwrap();
    assert_eq!(cfg, IdleConfig::default());
}

#[test]
fn from_env_applies_overrides() {
    let _guard = env_guard();
    unsafe {
        clear_idle_env();
        std::env::set_var("IDLE_WINDOW_SECS", "10");
        std::env::set_var("IDLE_WARNING_SECS", "5");
        std::env::set_var("IDLE_THROTTLE_MS", "250");
        std::env::set_var("IDLE_LOGIN_ROUTE", "/signin");
    }

    let cfg = IdleConfig::from_env().unwrap();
    assert_eq!(cfg.idle_window, Duration::from_secs(10));
    assert_eq!(cfg.warning, Duration::from_secs(5));
    assert_eq!(cfg.throttle, Duration::from_millis(250));
    assert_eq!(cfg.login_route, "/signin");

    unsafe { clear_idle_env() };
}

#[test]
fn from_env_rejects_zero_warning() {
    let _guard = env_guard();
    unsafe {
        clear_idle_env();
        std::env::set_var("IDLE_WARNING_SECS", "0");
    }

    let err = IdleConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("warning"));

    unsafe { clear_idle_env() };
}

#[test]
fn from_env_ignores_unparseable_values() {
    let _guard = env_guard();
    unsafe {
        clear_idle_env();
        std::env::set_var("IDLE_WINDOW_SECS", "soon");
    }

    let cfg = IdleConfig::from_env().unwrap();
    assert_eq!(cfg.idle_window, Duration::from_secs(DEFAULT_IDLE_WINDOW_SECS));

    unsafe { clear_idle_env() };
}

// =============================================================================
// validate
// =============================================================================

#[test]
fn validate_rejects_zero_idle_window() {
    let cfg = IdleConfig { idle_window: Duration::ZERO, ..IdleConfig::default() };
    assert!(matches!(cfg.validate(), Err(IdleError::InvalidConfig(_))));
}

#[test]
fn validate_rejects_fractional_warning() {
    let cfg = IdleConfig { warning: Duration::from_millis(1500), ..IdleConfig::default() };
    assert!(matches!(cfg.validate(), Err(IdleError::InvalidConfig(_))));
}

#[test]
fn validate_rejects_relative_login_route() {
    let cfg = IdleConfig { login_route: "auth/login".into(), ..IdleConfig::default() };
    assert!(matches!(cfg.validate(), Err(IdleError::InvalidConfig(_))));
}

#[test]
fn validate_rejects_idle_window_overflowing_millis() {
    let cfg = IdleConfig { idle_window: Duration::from_secs(u64::MAX), ..IdleConfig::default() };
    assert!(matches!(cfg.validate(), Err(IdleError::InvalidConfig(_))));

    let cfg = IdleConfig { idle_window: Duration::from_secs(u64::MAX / 1000), ..IdleConfig::default() };
    assert!(matches!(cfg.validate(), Err(IdleError::InvalidConfig(_))));
}

#[test]
fn from_env_rejects_huge_idle_window() {
    let _guard = env_guard();
    unsafe {
        clear_idle_env();
        std::env::set_var("IDLE_WINDOW_SECS", u64::MAX.to_string());
    }

    let err = IdleConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("idle window"));

    unsafe { clear_idle_env() };
}

#[test]
fn combined_timeout_saturates_on_unvalidated_config() {
    let cfg = IdleConfig { idle_window: Duration::MAX, ..IdleConfig::default() };
    assert_eq!(cfg.combined_timeout(), Duration::MAX);
    assert_eq!(cfg.combined_timeout_ms(), i64::MAX);
}
