//! Capability kits.
//!
//! A kit is a named object exposing operations to hosted plugin code.
//! Global kits are process-wide singletons; context-bound kits are
//! instantiated fresh per request and never shared across in-flight
//! requests.

use std::any::Any;
use std::sync::Arc;

use arbor_core::{Headers, RequestMeta, TransactionId};

/// A named capability registered with a policy.
pub trait Kit: Send + Sync {
    /// The name plugin code uses to reach this capability.
    fn name(&self) -> &str;

    /// Whether this kit needs a per-request instance for the given
    /// request. Only consulted for contextual registrations; a kit may
    /// opt out for requests it does not care about.
    fn requires_context(&self, request: &RequestMeta) -> bool;

    /// Build the per-request instance. Called at context-build time,
    /// once per request for which [`Kit::requires_context`] returned
    /// true. Global kits are never asked to materialize.
    fn materialize(&self, txn_id: &TransactionId) -> Box<dyn ContextKit>;
}

/// A per-request kit instance bound to one execution context.
pub trait ContextKit: Send {
    /// Downcast access for handlers that know the concrete kit type.
    fn as_any(&mut self) -> &mut dyn Any;

    /// Teardown hook, invoked exactly once when the context is
    /// released, on every exit path. Headers contributed here end up on
    /// the response (unless the response is an authorization failure).
    fn end_context(&mut self, response_headers: &mut Headers);
}

/// How a kit participates in the request lifecycle.
///
/// The category is declared at registration, not detected at runtime:
/// a `Global` kit is handed to every context as the same shared
/// instance, while a `Contextual` kit is materialized per request.
#[derive(Clone)]
pub enum KitRegistration {
    /// One shared instance for the process lifetime.
    Global(Arc<dyn Kit>),
    /// A fresh instance per request context.
    Contextual(Arc<dyn Kit>),
}

impl KitRegistration {
    /// The registered kit.
    #[must_use]
    pub fn kit(&self) -> &Arc<dyn Kit> {
        match self {
            Self::Global(kit) | Self::Contextual(kit) => kit,
        }
    }

    /// Whether this registration materializes per request.
    #[must_use]
    pub fn is_contextual(&self) -> bool {
        matches!(self, Self::Contextual(_))
    }
}

impl std::fmt::Debug for KitRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global(kit) => write!(f, "Global({})", kit.name()),
            Self::Contextual(kit) => write!(f, "Contextual({})", kit.name()),
        }
    }
}
