use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::plugin::PluginDefinition;

/// Plugin store seam. `load` does no authorization; the permission gate has
/// already run by the time a lookup key reaches it.
#[async_trait]
pub trait PluginStore: Send + Sync {
    async fn load(&self, lookup_key: &str) -> Option<PluginDefinition>;
}

/// Definitions held in memory, keyed by lookup key.
#[derive(Debug, Default)]
pub struct InMemoryPluginStore {
    plugins: DashMap<String, PluginDefinition>,
}

impl InMemoryPluginStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { plugins: DashMap::new() })
    }

    /// Register a definition under its own id.
    pub fn insert(&self, plugin: PluginDefinition) {
        self.plugins.insert(plugin.id.clone(), plugin);
    }

    /// Register a definition under an explicit combined key, for platform
    /// plugins stored as `platform-<key>`.
    pub fn insert_keyed(&self, key: impl Into<String>, plugin: PluginDefinition) {
        self.plugins.insert(key.into(), plugin);
    }

    pub fn remove(&self, lookup_key: &str) {
        self.plugins.remove(lookup_key);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[async_trait]
impl PluginStore for InMemoryPluginStore {
    async fn load(&self, lookup_key: &str) -> Option<PluginDefinition> {
        self.plugins.get(lookup_key).map(|entry| entry.value().clone())
    }
}
