//! Import scanning at the plugin-load boundary.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{CapabilityError, CapabilityResult};
use crate::manifest::PluginManifest;
use crate::policy::Policy;

/// One disallowed import found during a permissive scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportViolation {
    /// The module that declared the import.
    pub importer: String,
    /// The rejected module.
    pub module: String,
}

/// Scan every module transitively reachable from the plugin's entry
/// module, checking each import against the policy allow-list.
///
/// Trusted plugins skip the scan. Disallowed imports are logged; the
/// full list is returned so the embedder can surface diagnostics. In
/// hardened mode the first violation aborts the load instead.
///
/// # Errors
///
/// Returns [`CapabilityError::MissingEntryModule`] if the manifest does
/// not declare its entry module, or [`CapabilityError::DisallowedImport`]
/// for the first violation under a hardened policy.
pub fn scan_imports(
    policy: &Policy,
    manifest: &PluginManifest,
) -> CapabilityResult<Vec<ImportViolation>> {
    if policy.trusted() {
        debug!(plugin = %manifest.identifier, "trusted plugin, skipping import scan");
        return Ok(Vec::new());
    }

    if manifest.module(&manifest.entry).is_none() {
        return Err(CapabilityError::MissingEntryModule {
            plugin: manifest.identifier.clone(),
            entry: manifest.entry.clone(),
        });
    }

    let mut violations = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut pending: Vec<&str> = vec![&manifest.entry];

    while let Some(name) = pending.pop() {
        if !visited.insert(name) {
            continue;
        }
        let Some(module) = manifest.module(name) else {
            // Reachable only as an import; already checked by its importer.
            continue;
        };
        for import in &module.imports {
            // Imports of the plugin's own modules recurse; everything
            // else must be on the allow-list.
            if manifest.module(import).is_some() {
                pending.push(import);
                continue;
            }
            if policy.allows_import(import) {
                continue;
            }
            warn!(
                plugin = %manifest.identifier,
                module = %import,
                importer = %module.name,
                "disallowed import"
            );
            if policy.hardened() {
                return Err(CapabilityError::DisallowedImport {
                    plugin: manifest.identifier.clone(),
                    module: import.clone(),
                    importer: module.name.clone(),
                });
            }
            violations.push(ImportViolation {
                importer: module.name.clone(),
                module: import.clone(),
            });
        }
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ModuleDecl;

    fn manifest() -> PluginManifest {
        PluginManifest {
            identifier: "com.example.feeds".to_string(),
            entry: "main".to_string(),
            modules: vec![
                ModuleDecl::new("main", ["helpers", "json"]),
                ModuleDecl::new("helpers", ["re", "sockets"]),
                ModuleDecl::new("unreached", ["os"]),
            ],
        }
    }

    #[test]
    fn allowed_imports_pass() {
        let policy = Policy::builder("standard")
            .allow_imports(["json", "re", "sockets"])
            .build();
        assert!(scan_imports(&policy, &manifest()).unwrap().is_empty());
    }

    #[test]
    fn transitive_violations_are_collected() {
        let policy = Policy::builder("standard").allow_import("json").build();
        let violations = scan_imports(&policy, &manifest()).unwrap();
        let rejected: Vec<_> = violations.iter().map(|v| v.module.as_str()).collect();
        assert!(rejected.contains(&"re"));
        assert!(rejected.contains(&"sockets"));
        // "os" is only imported by a module nothing reaches.
        assert!(!rejected.contains(&"os"));
    }

    #[test]
    fn hardened_mode_aborts_on_first_violation() {
        let policy = Policy::builder("standard")
            .allow_import("json")
            .hardened(true)
            .build();
        assert!(matches!(
            scan_imports(&policy, &manifest()),
            Err(CapabilityError::DisallowedImport { .. })
        ));
    }

    #[test]
    fn trusted_plugins_skip_the_scan() {
        let policy = Policy::builder("elevated").trusted(true).build();
        assert!(scan_imports(&policy, &manifest()).unwrap().is_empty());
    }

    #[test]
    fn undeclared_entry_module_is_rejected() {
        let policy = Policy::builder("standard").build();
        let mut bad = manifest();
        bad.entry = "missing".to_string();
        assert!(matches!(
            scan_imports(&policy, &bad),
            Err(CapabilityError::MissingEntryModule { .. })
        ));
    }
}
