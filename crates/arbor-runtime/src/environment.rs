//! The shared value environment.
//!
//! Mutable dict-like values exposed to handler code are logically
//! per-call: each context gets a snapshot of the globals, and a
//! handler's writes stay visible only within its own context. State
//! meant to outlive a request flows through kits, caches, and the other
//! shared backing stores instead.

use std::collections::HashMap;
use std::sync::RwLock;

/// Process-wide named values snapshotted into every request context.
#[derive(Debug, Default)]
pub struct SharedEnvironment {
    globals: RwLock<HashMap<String, serde_json::Value>>,
}

impl SharedEnvironment {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a global value, visible to contexts built afterwards.
    pub fn set_global(&self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        if let Ok(mut globals) = self.globals.write() {
            globals.insert(name.into(), value.into());
        }
    }

    /// Read a global value.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<serde_json::Value> {
        self.globals
            .read()
            .ok()
            .and_then(|globals| globals.get(name).cloned())
    }

    /// Copy the current globals for a new context.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.globals
            .read()
            .map(|globals| globals.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_are_independent_of_later_writes() {
        let env = SharedEnvironment::new();
        env.set_global("region", "eu");

        let snapshot = env.snapshot();
        env.set_global("region", "us");

        assert_eq!(snapshot.get("region"), Some(&serde_json::json!("eu")));
        assert_eq!(env.global("region"), Some(serde_json::json!("us")));
    }
}
