//! Capability error types.

use thiserror::Error;

/// Errors that can occur resolving or loading capabilities.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// No kit is registered under the requested name.
    #[error("unknown capability: {name}")]
    UnknownKit {
        /// The name that failed to resolve.
        name: String,
    },

    /// A context-bound kit was requested with no active request context.
    #[error("capability '{name}' requires an active request context")]
    RequiresContext {
        /// The kit that was requested.
        name: String,
    },

    /// A plugin imports a module its policy does not allow.
    #[error("plugin '{plugin}' imports disallowed module '{module}' (from '{importer}')")]
    DisallowedImport {
        /// The plugin being loaded.
        plugin: String,
        /// The rejected module.
        module: String,
        /// The module that declared the import.
        importer: String,
    },

    /// A manifest names an entry module it does not declare.
    #[error("plugin '{plugin}' entry module '{entry}' is not declared in the manifest")]
    MissingEntryModule {
        /// The plugin being loaded.
        plugin: String,
        /// The undeclared entry module.
        entry: String,
    },
}

impl From<CapabilityError> for arbor_core::FrameworkError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::UnknownKit { name }
            | CapabilityError::RequiresContext { name } => Self::RequiresContext { name },
            other => Self::PolicyViolation {
                detail: other.to_string(),
            },
        }
    }
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;
