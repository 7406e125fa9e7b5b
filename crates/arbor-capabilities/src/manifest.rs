//! Plugin manifests.
//!
//! A manifest declares the modules a plugin ships and what each of them
//! imports. The declaration replaces runtime import interception: the
//! load boundary walks the declared graph once and rejects anything the
//! policy does not allow.

use serde::{Deserialize, Serialize};

/// One module shipped by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDecl {
    /// Module name, unique within the plugin.
    pub name: String,
    /// Modules and external packages this module imports.
    #[serde(default)]
    pub imports: Vec<String>,
}

impl ModuleDecl {
    /// Declare a module with its imports.
    #[must_use]
    pub fn new(name: impl Into<String>, imports: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            imports: imports.into_iter().map(Into::into).collect(),
        }
    }
}

/// The load-time declaration of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Reverse-DNS plugin identifier.
    pub identifier: String,
    /// The module executed at plugin start.
    pub entry: String,
    /// Every module the plugin ships.
    #[serde(default)]
    pub modules: Vec<ModuleDecl>,
}

impl PluginManifest {
    /// Create a manifest with a single entry module and no imports.
    #[must_use]
    pub fn minimal(identifier: impl Into<String>, entry: impl Into<String>) -> Self {
        let entry = entry.into();
        Self {
            identifier: identifier.into(),
            entry: entry.clone(),
            modules: vec![ModuleDecl::new(entry, Vec::<String>::new())],
        }
    }

    /// Look up a declared module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleDecl> {
        self.modules.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_deserializes_without_imports() {
        let manifest: PluginManifest = serde_json::from_str(
            r#"{
                "identifier": "com.example.feeds",
                "entry": "main",
                "modules": [{"name": "main"}]
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.module("main").unwrap().imports.len(), 0);
        assert!(manifest.module("other").is_none());
    }
}
