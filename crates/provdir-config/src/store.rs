//! Process-wide holder of the current settings snapshot

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::settings::Settings;

/// Publishes the current [`Settings`] snapshot to concurrent readers.
///
/// Reads are lock-free. Writers derive a new snapshot from the current one;
/// concurrent writes to different keys are both kept, writes to the same key
/// are last-writer-wins.
#[derive(Debug)]
pub struct SettingsStore {
    current: ArcSwap<Settings>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: ArcSwap::from_pointee(settings),
        }
    }

    /// Current snapshot. Holders keep seeing it unchanged after later writes.
    pub fn snapshot(&self) -> Arc<Settings> {
        self.current.load_full()
    }

    /// Set a key and publish the resulting snapshot
    pub fn set(&self, key: &str, value: impl Into<String>) -> Arc<Settings> {
        let value = value.into();
        self.current
            .rcu(|current| Arc::new(current.with_override(key, value.clone())));
        let published = self.current.load_full();
        debug!(key, version = published.version(), "Settings override applied");
        published
    }

    /// Remove a key and publish the resulting snapshot
    pub fn remove(&self, key: &str) -> Arc<Settings> {
        self.current.rcu(|current| Arc::new(current.without(key)));
        let published = self.current.load_full();
        debug!(key, version = published.version(), "Settings key removed");
        published
    }
}
