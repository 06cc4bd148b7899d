//! Idle-session monitor for a multi-tab storefront client.
//!
//! Detects inactivity, shows a warning countdown, and forces logout, while
//! keeping every tab of the same origin consistent through a shared
//! key-value store.
//!
//! - [`monitor`] holds the sans-IO state machine.
//! - [`controller`] drives it with tokio timers and the auth collaborator.
//! - [`storage`] is the replicated store tabs share.

pub mod activity;
pub mod auth;
pub mod clock;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod monitor;
pub mod storage;

pub use activity::ActivitySignal;
pub use auth::{AuthStore, LogNavigator, Navigator, SessionAuth, User};
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::IdleConfig;
pub use controller::SessionController;
pub use error::IdleError;
pub use monitor::{IdleMonitor, LogoutReason, SessionState, SessionView, Visibility};
pub use storage::{SharedStorage, StorageEvent, StorageHub, TabStorage};
