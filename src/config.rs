//! Idle policy configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Defaults are the externally observable contract: a 14 minute idle window,
//! a 60 second warning, and a 1 second activity throttle. Environment
//! overrides exist for demos and staging environments that need shorter
//! windows.

use std::time::Duration;

use crate::error::IdleError;

pub const DEFAULT_IDLE_WINDOW_SECS: u64 = 14 * 60;
pub const DEFAULT_WARNING_SECS: u64 = 60;
pub const DEFAULT_THROTTLE_MS: u64 = 1000;
pub const DEFAULT_LOGIN_ROUTE: &str = "/auth/login";

/// Storage key holding the last activity timestamp (epoch millis, decimal).
pub const ACTIVITY_KEY: &str = "tomato_last_activity";
/// Storage key holding the signed-in user's JSON record.
pub const CURRENT_USER_KEY: &str = "tomato_current_user";
/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "tomato_token";

/// Keys shared by every tab of the same origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub activity: String,
    pub current_user: String,
    pub token: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            activity: ACTIVITY_KEY.to_owned(),
            current_user: CURRENT_USER_KEY.to_owned(),
            token: TOKEN_KEY.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleConfig {
    /// Inactivity tolerated before the warning appears.
    pub idle_window: Duration,
    /// Countdown length during which the user may still extend.
    pub warning: Duration,
    /// Minimum spacing between processed activity signals.
    pub throttle: Duration,
    /// Route the navigator is sent to on logout.
    pub login_route: String,
    pub keys: StorageKeys,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_window: Duration::from_secs(DEFAULT_IDLE_WINDOW_SECS),
            warning: Duration::from_secs(DEFAULT_WARNING_SECS),
            throttle: Duration::from_millis(DEFAULT_THROTTLE_MS),
            login_route: DEFAULT_LOGIN_ROUTE.to_owned(),
            keys: StorageKeys::default(),
        }
    }
}

impl IdleConfig {
    /// Build the idle policy from environment variables.
    ///
    /// Optional:
    /// - `IDLE_WINDOW_SECS`: default 840
    /// - `IDLE_WARNING_SECS`: default 60
    /// - `IDLE_THROTTLE_MS`: default 1000
    /// - `IDLE_LOGIN_ROUTE`: default `/auth/login`
    pub fn from_env() -> Result<Self, IdleError> {
        let config = Self {
            idle_window: Duration::from_secs(env_parse("IDLE_WINDOW_SECS", DEFAULT_IDLE_WINDOW_SECS)),
            warning: Duration::from_secs(env_parse("IDLE_WARNING_SECS", DEFAULT_WARNING_SECS)),
            throttle: Duration::from_millis(env_parse("IDLE_THROTTLE_MS", DEFAULT_THROTTLE_MS)),
            login_route: std::env::var("IDLE_LOGIN_ROUTE").unwrap_or_else(|_| DEFAULT_LOGIN_ROUTE.to_owned()),
            keys: StorageKeys::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject policies the state machine cannot honor.
    pub fn validate(&self) -> Result<(), IdleError> {
        if self.idle_window.is_zero() {
            return Err(IdleError::InvalidConfig("idle window must be non-zero".into()));
        }
        if self.warning.as_secs() == 0 || self.warning.subsec_nanos() != 0 {
            return Err(IdleError::InvalidConfig(format!(
                "warning must be a whole number of seconds >= 1 (got {:?})",
                self.warning
            )));
        }
        if u32::try_from(self.warning.as_secs()).is_err() {
            return Err(IdleError::InvalidConfig("warning duration too large".into()));
        }
        let fits_millis = self
            .idle_window
            .checked_add(self.warning)
            .is_some_and(|total| i64::try_from(total.as_millis()).is_ok());
        if !fits_millis {
            return Err(IdleError::InvalidConfig(format!(
                "idle window plus warning overflows epoch millis (got {:?})",
                self.idle_window
            )));
        }
        if !self.login_route.starts_with('/') {
            return Err(IdleError::InvalidConfig(format!(
                "login route must be absolute (got '{}')",
                self.login_route
            )));
        }
        Ok(())
    }

    /// Idle window plus warning: total inactivity tolerated before forced logout.
    #[must_use]
    pub fn combined_timeout(&self) -> Duration {
        self.idle_window.saturating_add(self.warning)
    }

    #[must_use]
    pub fn idle_window_ms(&self) -> i64 {
        duration_ms(self.idle_window)
    }

    #[must_use]
    pub fn combined_timeout_ms(&self) -> i64 {
        duration_ms(self.combined_timeout())
    }

    #[must_use]
    pub fn throttle_ms(&self) -> i64 {
        duration_ms(self.throttle)
    }

    /// Warning length in whole seconds (validated to fit `u32`).
    #[must_use]
    pub fn warning_secs(&self) -> u32 {
        u32::try_from(self.warning.as_secs()).unwrap_or(u32::MAX)
    }
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
