//! Named engines with a default fallback.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::networking::Networking;

/// Engines registered by name.
#[derive(Debug)]
pub struct NetworkingRegistry {
    default: Arc<Networking>,
    networkings: RwLock<HashMap<String, Arc<Networking>>>,
}

impl NetworkingRegistry {
    /// Registry falling back to `default` for unknown names.
    #[must_use]
    pub fn new(default: Arc<Networking>) -> Self {
        Self {
            default,
            networkings: RwLock::new(HashMap::new()),
        }
    }

    /// Register `networking` under `name`, replacing any previous entry.
    pub fn register(&self, name: impl Into<String>, networking: Arc<Networking>) {
        self.networkings.write().insert(name.into(), networking);
    }

    /// Returns `true` if an engine was registered under `name`.
    #[must_use]
    pub fn unregister(&self, name: &str) -> bool {
        self.networkings.write().remove(name).is_some()
    }

    /// Engine registered under `name`, or the default engine.
    #[must_use]
    pub fn networking(&self, name: &str) -> Arc<Networking> {
        self.networkings
            .read()
            .get(name)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default))
    }

    /// The fallback engine.
    #[must_use]
    pub fn default_networking(&self) -> Arc<Networking> {
        Arc::clone(&self.default)
    }
}
