//! Error type shared by the idle-session crate.
//!
//! ERROR HANDLING
//! ==============
//! Storage access is treated as always available, so nothing here models I/O
//! failure. Countdown expiry is a designed transition, not an error; only
//! misconfiguration, starting without a session, and unreadable user records
//! surface as `IdleError`.

/// Errors returned by configuration, the session controller, and the auth store.
#[derive(Debug, thiserror::Error)]
pub enum IdleError {
    /// A configuration value is out of range.
    #[error("invalid idle configuration: {0}")]
    InvalidConfig(String),
    /// Monitoring was requested while no user is signed in.
    #[error("cannot start idle monitoring without an active session")]
    NoSession,
    /// The stored current-user record is not valid JSON for [`crate::auth::User`].
    #[error("malformed current-user record: {0}")]
    UserRecord(#[from] serde_json::Error),
}
