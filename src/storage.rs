//! Replicated key-value store shared by every tab of one origin.
//!
//! DESIGN
//! ======
//! One `StorageHub` holds the values; each tab gets a `TabStorage` handle
//! tagged with its own id. Writes are last-writer-wins and, when they change a
//! value, publish a `StorageEvent` on a broadcast channel. A tab's
//! subscription skips events it wrote itself, matching how a browser delivers
//! `storage` events to sibling tabs but never to the writer.
//!
//! TRADE-OFFS
//! ==========
//! No locking spans a read-modify-write. Only timestamps and presence flags
//! live here, and staleness up to the activity throttle is tolerated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Identifier of one tab attached to a hub.
pub type TabId = Uuid;

/// A change to one key, as observed by a sibling tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
}

/// Storage medium consumed by the idle monitor and the auth store.
pub trait SharedStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    /// Change notifications written by other tabs.
    fn subscribe(&self) -> StorageEvents;
}

#[derive(Debug, Clone)]
struct Envelope {
    origin: TabId,
    event: StorageEvent,
}

/// The shared backing store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StorageHub {
    values: Arc<Mutex<HashMap<String, String>>>,
    events: broadcast::Sender<Envelope>,
}

impl StorageHub {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { values: Arc::new(Mutex::new(HashMap::new())), events }
    }

    /// Attach a new tab with a fresh id.
    #[must_use]
    pub fn open_tab(&self) -> TabStorage {
        TabStorage { hub: self.clone(), tab: Uuid::new_v4() }
    }

    fn write(&self, origin: TabId, key: &str, value: Option<&str>) {
        let changed = {
            let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
            match value {
                Some(v) => values.insert(key.to_owned(), v.to_owned()).as_deref() != Some(v),
                None => values.remove(key).is_some(),
            }
        };
        if !changed {
            return;
        }
        let event = StorageEvent { key: key.to_owned(), new_value: value.map(str::to_owned) };
        // No receivers is fine: a lone tab has nobody to notify.
        let _ = self.events.send(Envelope { origin, event });
    }

    fn read(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }
}

impl Default for StorageHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One tab's view of a [`StorageHub`].
#[derive(Debug, Clone)]
pub struct TabStorage {
    hub: StorageHub,
    tab: TabId,
}

impl TabStorage {
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab
    }
}

impl SharedStorage for TabStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.hub.read(key)
    }

    fn set(&self, key: &str, value: &str) {
        self.hub.write(self.tab, key, Some(value));
    }

    fn remove(&self, key: &str) {
        self.hub.write(self.tab, key, None);
    }

    fn subscribe(&self) -> StorageEvents {
        StorageEvents { rx: self.hub.events.subscribe(), tab: self.tab }
    }
}

/// Stream of sibling-tab changes for one tab.
#[derive(Debug)]
pub struct StorageEvents {
    rx: broadcast::Receiver<Envelope>,
    tab: TabId,
}

impl StorageEvents {
    /// Next change written by another tab, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.origin == self.tab => {}
                Ok(envelope) => return Some(envelope.event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(tab = %self.tab, skipped, "storage subscription lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`StorageEvents::recv`].
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) if envelope.origin == self.tab => {}
                Ok(envelope) => return Some(envelope.event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(tab = %self.tab, skipped, "storage subscription lagged; events dropped");
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
