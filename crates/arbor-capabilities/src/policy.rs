//! Policies.
//!
//! A policy is the named bundle a plugin is loaded under: which kits its
//! code can reach and which module imports are allowed. Policies are
//! selected at load time and immutable thereafter.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{CapabilityError, CapabilityResult};
use crate::kit::{Kit, KitRegistration};

/// An immutable capability bundle.
pub struct Policy {
    name: String,
    kits: HashMap<String, KitRegistration>,
    allowed_imports: HashSet<String>,
    trusted: bool,
    hardened: bool,
}

impl Policy {
    /// Start building a policy.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PolicyBuilder {
        PolicyBuilder {
            name: name.into(),
            kits: HashMap::new(),
            allowed_imports: HashSet::new(),
            trusted: false,
            hardened: false,
        }
    }

    /// The policy's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a kit registration.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownKit`] for a name the policy
    /// never registered.
    pub fn kit(&self, name: &str) -> CapabilityResult<&KitRegistration> {
        self.kits.get(name).ok_or_else(|| CapabilityError::UnknownKit {
            name: name.to_string(),
        })
    }

    /// Iterate over every registration.
    pub fn registrations(&self) -> impl Iterator<Item = (&str, &KitRegistration)> {
        self.kits.iter().map(|(name, reg)| (name.as_str(), reg))
    }

    /// Whether plugins under this policy may import `module`.
    #[must_use]
    pub fn allows_import(&self, module: &str) -> bool {
        self.allowed_imports.contains(module)
    }

    /// Trusted plugins skip import scanning entirely.
    #[must_use]
    pub fn trusted(&self) -> bool {
        self.trusted
    }

    /// In hardened mode a disallowed import aborts plugin loading.
    #[must_use]
    pub fn hardened(&self) -> bool {
        self.hardened
    }
}

impl std::fmt::Debug for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Policy")
            .field("name", &self.name)
            .field("kits", &self.kits.len())
            .field("allowed_imports", &self.allowed_imports.len())
            .field("trusted", &self.trusted)
            .field("hardened", &self.hardened)
            .finish()
    }
}

/// Builder for [`Policy`].
pub struct PolicyBuilder {
    name: String,
    kits: HashMap<String, KitRegistration>,
    allowed_imports: HashSet<String>,
    trusted: bool,
    hardened: bool,
}

impl PolicyBuilder {
    /// Register a process-wide singleton kit.
    #[must_use]
    pub fn global_kit(mut self, kit: Arc<dyn Kit>) -> Self {
        self.kits
            .insert(kit.name().to_string(), KitRegistration::Global(kit));
        self
    }

    /// Register a kit materialized fresh per request.
    #[must_use]
    pub fn contextual_kit(mut self, kit: Arc<dyn Kit>) -> Self {
        self.kits
            .insert(kit.name().to_string(), KitRegistration::Contextual(kit));
        self
    }

    /// Allow plugins to import a module.
    #[must_use]
    pub fn allow_import(mut self, module: impl Into<String>) -> Self {
        self.allowed_imports.insert(module.into());
        self
    }

    /// Extend the import allow-list.
    #[must_use]
    pub fn allow_imports(mut self, modules: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_imports
            .extend(modules.into_iter().map(Into::into));
        self
    }

    /// Mark plugins under this policy as trusted (skips import scanning).
    #[must_use]
    pub fn trusted(mut self, trusted: bool) -> Self {
        self.trusted = trusted;
        self
    }

    /// Abort loading on the first disallowed import.
    #[must_use]
    pub fn hardened(mut self, hardened: bool) -> Self {
        self.hardened = hardened;
        self
    }

    /// Finish the policy.
    #[must_use]
    pub fn build(self) -> Arc<Policy> {
        Arc::new(Policy {
            name: self.name,
            kits: self.kits,
            allowed_imports: self.allowed_imports,
            trusted: self.trusted,
            hardened: self.hardened,
        })
    }
}
