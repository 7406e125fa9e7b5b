//! The runtime facade.
//!
//! Owns the components a loaded plugin runs against: the active policy,
//! the dispatcher, the task pool, the named-primitive registry, the
//! cache store, and the shared value environment. The listening
//! transport calls [`Runtime::handle_request`] with `(path, method,
//! headers)` and sends back whatever it returns.

use std::str::FromStr;
use std::sync::Arc;

use arbor_capabilities::{ImportViolation, Kit, PluginManifest, Policy, scan_imports};
use arbor_cache::CacheStore;
use arbor_config::RuntimeConfig;
use arbor_core::{
    FrameworkError, FrameworkResult, Headers, Method, RequestMeta, WireResponse,
};
use arbor_tasks::{PrimitiveRegistry, TaskPool};
use tracing::info;

use crate::builder::ContextBuilder;
use crate::dispatcher::Dispatcher;
use crate::environment::SharedEnvironment;
use crate::error::RuntimeResult;

/// The assembled extension-host runtime for one loaded plugin.
pub struct Runtime {
    config: RuntimeConfig,
    builder: ContextBuilder,
    dispatcher: Dispatcher,
    environment: Arc<SharedEnvironment>,
    task_pool: Arc<TaskPool>,
    primitives: Arc<PrimitiveRegistry>,
    caches: Arc<CacheStore>,
}

impl Runtime {
    /// Assemble a runtime for the given configuration and policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the task
    /// pool's worker threads cannot be started.
    pub fn new(config: RuntimeConfig, policy: Arc<Policy>) -> RuntimeResult<Self> {
        config.validate()?;

        let task_pool = Arc::new(TaskPool::new(
            config.task_pool.maximum_threads,
            config.task_pool.priority_threads,
        )?);
        let environment = Arc::new(SharedEnvironment::new());
        let builder = ContextBuilder::new(
            Arc::clone(&policy),
            Arc::clone(&environment),
            config.cache.default_cache_time,
        );
        let dispatcher = Dispatcher::new(config.debug);
        let caches = Arc::new(CacheStore::new(config.cache.root.clone()));

        info!(policy = policy.name(), "runtime assembled");
        Ok(Self {
            config,
            builder,
            dispatcher,
            environment,
            task_pool,
            primitives: Arc::new(PrimitiveRegistry::new()),
            caches,
        })
    }

    /// Enforce the policy's import allow-list against a plugin manifest.
    ///
    /// Disallowed imports are logged and returned; under a hardened
    /// policy the first one aborts the load.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed manifest, or for the first
    /// disallowed import when the policy is hardened.
    pub fn load_plugin(&self, manifest: &PluginManifest) -> RuntimeResult<Vec<ImportViolation>> {
        let violations = scan_imports(self.builder.policy(), manifest)?;
        info!(
            plugin = %manifest.identifier,
            violations = violations.len(),
            "loaded plugin manifest"
        );
        Ok(violations)
    }

    /// Handle one inbound request from the transport collaborator.
    ///
    /// An unparseable method resolves nothing and answers 404.
    #[must_use]
    pub fn handle_request(&self, path: &str, method: &str, headers: Headers) -> WireResponse {
        let Ok(method) = Method::from_str(method) else {
            return WireResponse::empty(404);
        };
        let request = RequestMeta {
            path: path.to_string(),
            method,
            headers,
        };
        self.dispatcher.handle_request(&self.builder, &request)
    }

    /// Resolve a global kit by name for code running outside any
    /// request, e.g. plugin start-up.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameworkError::RequiresContext`] failure for an
    /// unknown name or for a kit that only exists per request.
    pub fn global_kit(&self, name: &str) -> FrameworkResult<Arc<dyn Kit>> {
        let registration = self.builder.policy().kit(name)?;
        if registration.is_contextual() {
            return Err(FrameworkError::RequiresContext {
                name: name.to_string(),
            });
        }
        Ok(Arc::clone(registration.kit()))
    }

    /// Trim every opened cache namespace to the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns the first eviction or persistence failure.
    pub fn trim_caches(&self) -> RuntimeResult<()> {
        self.caches
            .trim_all(self.config.cache.max_size, self.config.cache.max_items)?;
        Ok(())
    }

    /// The handler registration surface.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The shared value environment snapshotted into each context.
    #[must_use]
    pub fn environment(&self) -> &Arc<SharedEnvironment> {
        &self.environment
    }

    /// The worker task pool.
    #[must_use]
    pub fn task_pool(&self) -> &Arc<TaskPool> {
        &self.task_pool
    }

    /// The process-wide named primitive registry.
    #[must_use]
    pub fn primitives(&self) -> &Arc<PrimitiveRegistry> {
        &self.primitives
    }

    /// The cache store backing response and data caching.
    #[must_use]
    pub fn caches(&self) -> &Arc<CacheStore> {
        &self.caches
    }

    /// The runtime configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("policy", &self.builder.policy().name())
            .field("workers", &self.task_pool.worker_count())
            .finish_non_exhaustive()
    }
}
