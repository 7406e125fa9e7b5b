//! Context construction and release.

use std::collections::HashMap;
use std::sync::Arc;

use arbor_capabilities::{ContextKit, Policy};
use arbor_core::{Headers, RequestMeta, TransactionId};
use tracing::debug;

use crate::context::ExecutionContext;
use crate::environment::SharedEnvironment;

/// Builds per-request execution contexts from the active policy.
pub struct ContextBuilder {
    policy: Arc<Policy>,
    environment: Arc<SharedEnvironment>,
    default_cache_time: u64,
}

impl ContextBuilder {
    /// Create a builder for the given policy and shared environment.
    #[must_use]
    pub fn new(
        policy: Arc<Policy>,
        environment: Arc<SharedEnvironment>,
        default_cache_time: u64,
    ) -> Self {
        Self {
            policy,
            environment,
            default_cache_time,
        }
    }

    /// The policy contexts are built against.
    #[must_use]
    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    /// Build a context for one request.
    ///
    /// Cheap and non-blocking: only kits registered as contextual whose
    /// `requires_context` predicate passes for this request are
    /// materialized. Everything else stays untouched.
    #[must_use]
    pub fn build_context(&self, request: &RequestMeta) -> ExecutionContext {
        let txn_id = TransactionId::from_headers(&request.headers);

        let mut kits: Vec<(String, Box<dyn ContextKit>)> = Vec::new();
        for (name, registration) in self.policy.registrations() {
            if registration.is_contextual() && registration.kit().requires_context(request) {
                kits.push((name.to_string(), registration.kit().materialize(&txn_id)));
            }
        }
        debug!(txn_id = %txn_id, kits = kits.len(), "built request context");

        ExecutionContext::new(
            txn_id,
            request.headers.clone(),
            parse_cookies(&request.headers),
            self.environment.snapshot(),
            kits,
            self.default_cache_time,
        )
    }

    /// Release a context, invoking each materialized kit's teardown
    /// exactly once, and collect the headers the kits contribute.
    ///
    /// Called on every exit path - success, handler failure, or abrupt
    /// teardown - via the dispatch boundary's scoped handling.
    pub fn release_context(&self, context: &mut ExecutionContext) -> Headers {
        context.release()
    }
}

impl std::fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("policy", &self.policy.name())
            .field("default_cache_time", &self.default_cache_time)
            .finish_non_exhaustive()
    }
}

/// Split a `Cookie` header into name/value pairs.
fn parse_cookies(headers: &Headers) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    let Some(raw) = headers.get("cookie") else {
        return cookies;
    };
    for pair in raw.split(';') {
        if let Some((name, value)) = pair.split_once('=') {
            cookies.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_capabilities::Kit;
    use arbor_core::Method;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingKit {
        name: &'static str,
        wanted: bool,
        teardowns: Arc<AtomicUsize>,
    }

    struct CountingInstance {
        teardowns: Arc<AtomicUsize>,
    }

    impl ContextKit for CountingInstance {
        fn as_any(&mut self) -> &mut dyn Any {
            self
        }

        fn end_context(&mut self, response_headers: &mut Headers) {
            self.teardowns.fetch_add(1, Ordering::SeqCst);
            response_headers.set("x-counting-kit", "done");
        }
    }

    impl Kit for CountingKit {
        fn name(&self) -> &str {
            self.name
        }

        fn requires_context(&self, _request: &RequestMeta) -> bool {
            self.wanted
        }

        fn materialize(&self, _txn_id: &TransactionId) -> Box<dyn ContextKit> {
            Box::new(CountingInstance {
                teardowns: Arc::clone(&self.teardowns),
            })
        }
    }

    fn request() -> RequestMeta {
        RequestMeta {
            path: "/feeds".to_string(),
            method: Method::Get,
            headers: Headers::new(),
        }
    }

    #[test]
    fn only_wanted_contextual_kits_materialize() {
        let teardowns = Arc::new(AtomicUsize::new(0));
        let policy = Policy::builder("test")
            .contextual_kit(Arc::new(CountingKit {
                name: "Wanted",
                wanted: true,
                teardowns: Arc::clone(&teardowns),
            }))
            .contextual_kit(Arc::new(CountingKit {
                name: "Unwanted",
                wanted: false,
                teardowns: Arc::clone(&teardowns),
            }))
            .build();

        let builder = ContextBuilder::new(policy, Arc::new(SharedEnvironment::new()), 0);
        let context = builder.build_context(&request());
        let names: Vec<_> = context.kit_names().collect();
        assert_eq!(names, vec!["Wanted"]);
    }

    #[test]
    fn release_runs_each_teardown_exactly_once() {
        let teardowns = Arc::new(AtomicUsize::new(0));
        let policy = Policy::builder("test")
            .contextual_kit(Arc::new(CountingKit {
                name: "Wanted",
                wanted: true,
                teardowns: Arc::clone(&teardowns),
            }))
            .build();

        let builder = ContextBuilder::new(policy, Arc::new(SharedEnvironment::new()), 0);
        let mut context = builder.build_context(&request());

        let headers = builder.release_context(&mut context);
        assert_eq!(headers.get("x-counting-kit"), Some("done"));
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);

        // A second release is a logged no-op.
        let headers = builder.release_context(&mut context);
        assert!(headers.is_empty());
        drop(context);
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_an_unreleased_context_still_tears_down_once() {
        let teardowns = Arc::new(AtomicUsize::new(0));
        let policy = Policy::builder("test")
            .contextual_kit(Arc::new(CountingKit {
                name: "Wanted",
                wanted: true,
                teardowns: Arc::clone(&teardowns),
            }))
            .build();

        let builder = ContextBuilder::new(policy, Arc::new(SharedEnvironment::new()), 0);
        let context = builder.build_context(&request());
        drop(context);
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cookies_are_parsed_from_the_request() {
        let policy = Policy::builder("test").build();
        let builder = ContextBuilder::new(policy, Arc::new(SharedEnvironment::new()), 0);

        let mut meta = request();
        meta.headers.set("Cookie", "session=abc123; theme=dark");
        let context = builder.build_context(&meta);
        assert_eq!(context.cookie("session"), Some("abc123"));
        assert_eq!(context.cookie("theme"), Some("dark"));
    }
}
