//! Request dispatch.
//!
//! Resolution priority is fixed: reserved management prefix, then
//! private framework handlers in registration order, then an exact
//! prefix-handler match, then the parameterized route table. The
//! dispatcher drives the context lifecycle around the call: the context
//! is built before resolution and released exactly once afterwards, on
//! every exit path.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::RwLock;

use arbor_core::{FrameworkError, FrameworkResult, Headers, RequestMeta, WireResponse, headers};
use arbor_telemetry::RequestContext;
use tracing::{debug, error};

use crate::builder::ContextBuilder;
use crate::context::ExecutionContext;
use crate::handler::{
    BodySerializer, Container, Handler, HandlerValue, JsonBodySerializer, Params, PrivateHandler,
};
use crate::router::Router;

/// Display metadata registered alongside a prefix handler, surfaced by
/// the management listing.
#[derive(Debug, Clone, Default)]
pub struct PrefixMetadata {
    /// Human-readable name of the handler.
    pub name: String,
    /// Free-form attributes (artwork paths, title bar, ...).
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl PrefixMetadata {
    /// Metadata with just a display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }
}

struct PrefixRecord {
    handler: Handler,
    metadata: PrefixMetadata,
}

/// Resolves inbound requests to handlers and builds wire responses.
pub struct Dispatcher {
    prefixes: RwLock<Vec<(String, PrefixRecord)>>,
    private_handlers: RwLock<Vec<PrivateHandler>>,
    functions: RwLock<HashMap<String, Handler>>,
    router: Router,
    serializer: Box<dyn BodySerializer>,
    debug: bool,
}

impl Dispatcher {
    /// Create a dispatcher using the default JSON body serializer.
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self::with_serializer(Box::new(JsonBodySerializer), debug)
    }

    /// Create a dispatcher with an explicit serialization collaborator.
    #[must_use]
    pub fn with_serializer(serializer: Box<dyn BodySerializer>, debug: bool) -> Self {
        Self {
            prefixes: RwLock::new(Vec::new()),
            private_handlers: RwLock::new(Vec::new()),
            functions: RwLock::new(HashMap::new()),
            router: Router::new(),
            serializer,
            debug,
        }
    }

    /// Register a prefix handler for a whole leading path.
    ///
    /// Safe under concurrent registration; plugin start-up code runs on
    /// its own thread and may race early requests.
    pub fn register_prefix(&self, path: impl Into<String>, handler: Handler, metadata: PrefixMetadata) {
        let path = path.into();
        debug!(prefix = %path, name = %metadata.name, "adding prefix handler");
        if let Ok(mut prefixes) = self.prefixes.write() {
            prefixes.push((path, PrefixRecord { handler, metadata }));
        }
    }

    /// Register a parameterized route for one method.
    pub fn register_route(
        &self,
        template: &str,
        handler: Handler,
        method: arbor_core::Method,
    ) {
        self.router.connect(template, handler, method);
    }

    /// Register a parameterized route with fixed constraint parameters.
    pub fn register_route_with_constraints(
        &self,
        template: &str,
        handler: Handler,
        method: arbor_core::Method,
        constraints: Params,
    ) {
        self.router
            .connect_with_constraints(template, handler, method, constraints);
    }

    /// Register a private framework handler, tried in registration
    /// order after management handling; the first non-`None` result
    /// wins.
    pub fn register_private_handler(&self, handler: PrivateHandler) {
        if let Ok(mut handlers) = self.private_handlers.write() {
            handlers.push(handler);
        }
    }

    /// Register a named function callable via
    /// `/<prefix>/:/function/<name>`.
    pub fn register_function(&self, name: impl Into<String>, handler: Handler) {
        if let Ok(mut functions) = self.functions.write() {
            functions.insert(name.into(), handler);
        }
    }

    /// Handle one request end to end: build a context, resolve and run
    /// the handler, construct the response, and release the context.
    pub fn handle_request(&self, builder: &ContextBuilder, request: &RequestMeta) -> WireResponse {
        let mut context = builder.build_context(request);
        let span = RequestContext::new("dispatcher")
            .with_operation("dispatch")
            .with_txn_id(context.txn_id().as_str())
            .span();
        let _guard = span.enter();

        debug!(method = %request.method, path = %request.path, "handling request");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.resolve(request, &mut context)
        }));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(FrameworkError::HandlerError {
                message: panic_message(payload.as_ref()),
            }),
        };

        let result = result.map(|value| self.page(value, request, &mut context));

        // Authorization and policy failures must not leak any header
        // mutated during the failed context.
        let shed_context_headers = matches!(
            &result,
            Err(FrameworkError::Unauthorized
                | FrameworkError::PolicyViolation { .. }
                | FrameworkError::RequiresContext { .. })
        );

        let (status, response_headers, body) = self.construct_response(result, &context);

        let kit_headers = builder.release_context(&mut context);

        let final_headers = if shed_context_headers {
            Headers::new()
        } else {
            let mut merged = kit_headers;
            merged.extend(&response_headers);
            merged
        };

        debug!(status, "response");
        WireResponse {
            status,
            headers: final_headers,
            body,
        }
    }

    /// Resolve the request to a handler and run it.
    fn resolve(
        &self,
        request: &RequestMeta,
        context: &mut ExecutionContext,
    ) -> FrameworkResult<HandlerValue> {
        let (path, query) = split_query(&request.path);
        let params = parse_query(query);
        let nouns = path_nouns(path);

        // Requests for the root answer with a bare OK.
        if nouns.is_empty() {
            return Ok(HandlerValue::Text("OK\n".to_string()));
        }

        // Reserved management prefix.
        if nouns[0] == ":" {
            if let Some(value) = self.handle_management(&nouns[1..], &params, context)? {
                return Ok(value);
            }
            if let Some(value) = self.try_private_handlers(&nouns[1..], &params, context)? {
                return Ok(value);
            }
            return Ok(HandlerValue::None);
        }

        // Full route path, normalized (no trailing slash).
        let route_path = format!("/{}", nouns.join("/"));

        // Exact prefix-handler match on the whole leading path.
        if let Some((prefix, handler)) = self.exact_prefix(&route_path) {
            context.set_prefix(prefix.clone());
            debug!(prefix = %prefix, "found prefix handler");
            return handler(context, &params);
        }

        // Pop the prefix for the internal-request check; routes still
        // match against the full path.
        let remaining = self.strip_prefix(&nouns, context);

        if remaining.len() > 1 && remaining[0] == ":" {
            if let Some(value) = self.handle_internal(&remaining[1..], &params, context)? {
                return Ok(value);
            }
            if let Some(value) = self.try_private_handlers(&remaining[1..], &params, context)? {
                return Ok(value);
            }
            return Ok(HandlerValue::None);
        }

        // Parameterized routes, first match wins.
        if let Some((handler, route_params)) = self.router.match_route(&route_path, request.method)
        {
            debug!(route = %route_path, "found route");
            let mut merged = route_params;
            // Query arguments override captured segments.
            for (name, value) in params {
                merged.insert(name, value);
            }
            return handler(context, &merged);
        }

        error!(route = %route_path, "could not find route");
        Ok(HandlerValue::None)
    }

    /// Management requests arrive from the host server under the
    /// reserved `/:/` prefix and cannot be produced by external paths.
    fn handle_management(
        &self,
        nouns: &[String],
        _params: &Params,
        _context: &mut ExecutionContext,
    ) -> FrameworkResult<Option<HandlerValue>> {
        if nouns.len() == 1 && nouns[0] == "prefixes" {
            let mut container = Container::new();
            if let Ok(prefixes) = self.prefixes.read() {
                for (path, record) in prefixes.iter() {
                    let mut item = serde_json::Map::new();
                    item.insert("key".to_string(), path.as_str().into());
                    item.insert("name".to_string(), record.metadata.name.as_str().into());
                    for (attr, value) in &record.metadata.attributes {
                        item.insert(attr.clone(), value.clone());
                    }
                    container.append(serde_json::Value::Object(item));
                }
            }
            return Ok(Some(HandlerValue::Container(container)));
        }
        Ok(None)
    }

    /// Internal requests are handled by the framework but reachable via
    /// an external interface: `/<prefix>/:/function/<name>`.
    fn handle_internal(
        &self,
        nouns: &[String],
        params: &Params,
        context: &mut ExecutionContext,
    ) -> FrameworkResult<Option<HandlerValue>> {
        if nouns[0] == "function" && (nouns.len() == 2 || nouns.len() == 3) {
            // Strip the extension, if one was included.
            let function_name = nouns[1]
                .rsplit_once('.')
                .map_or(nouns[1].as_str(), |(stem, _)| stem);
            debug!(function = %function_name, "calling named function");

            let handler = self
                .functions
                .read()
                .ok()
                .and_then(|functions| functions.get(function_name).cloned());
            let Some(handler) = handler else {
                return Ok(None);
            };

            let mut call_params = params.clone();
            if let Some(query) = nouns.get(2) {
                call_params.insert("query".to_string(), query.clone());
            }
            return handler(context, &call_params).map(Some);
        }
        Ok(None)
    }

    fn try_private_handlers(
        &self,
        nouns: &[String],
        params: &Params,
        context: &mut ExecutionContext,
    ) -> FrameworkResult<Option<HandlerValue>> {
        let handlers: Vec<PrivateHandler> = match self.private_handlers.read() {
            Ok(handlers) => handlers.clone(),
            Err(_) => Vec::new(),
        };
        for handler in handlers {
            if let Some(value) = handler(nouns, params, context)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn exact_prefix(&self, path: &str) -> Option<(String, Handler)> {
        let prefixes = self.prefixes.read().ok()?;
        prefixes
            .iter()
            .find(|(prefix, _)| prefix == path)
            .map(|(prefix, record)| (prefix.clone(), record.handler.clone()))
    }

    /// Pop the matching registered prefix from the path nouns, storing
    /// it on the context.
    fn strip_prefix(&self, nouns: &[String], context: &mut ExecutionContext) -> Vec<String> {
        let path = format!("/{}", nouns.join("/"));
        if let Ok(prefixes) = self.prefixes.read() {
            for (prefix, _) in prefixes.iter() {
                if path.starts_with(&format!("{prefix}/")) {
                    context.set_prefix(prefix.clone());
                    let skip = prefix.trim_start_matches('/').split('/').count();
                    return nouns.iter().skip(skip).cloned().collect();
                }
            }
        }
        nouns.to_vec()
    }

    /// Slice a listable container when the request carries paging
    /// hints, annotating the total size. Handlers never page.
    fn page(
        &self,
        value: HandlerValue,
        request: &RequestMeta,
        context: &mut ExecutionContext,
    ) -> HandlerValue {
        let HandlerValue::Container(mut container) = value else {
            return value;
        };
        let Some((start, size)) = request.headers.paging_window() else {
            return HandlerValue::Container(container);
        };

        let total = container.items.len();
        let window: Vec<serde_json::Value> = container
            .items
            .into_iter()
            .skip(start)
            .take(size)
            .collect();
        container.items = window;
        container.set_attribute("total_size", total);

        context.set_header(headers::CONTAINER_START, start.to_string());
        context.set_header(headers::CONTAINER_TOTAL_SIZE, total.to_string());
        HandlerValue::Container(container)
    }

    /// Convert a handler outcome into `(status, headers, body)`.
    fn construct_response(
        &self,
        result: FrameworkResult<HandlerValue>,
        context: &ExecutionContext,
    ) -> (u16, Headers, Vec<u8>) {
        match result {
            Ok(value) => {
                let (automatic_status, mut response_headers, body) = match value {
                    HandlerValue::None => (404, Headers::new(), Vec::new()),
                    HandlerValue::Text(text) => {
                        let mut headers = Headers::new();
                        headers.set("content-type", "text/plain");
                        (200, headers, text.into_bytes())
                    }
                    HandlerValue::Data {
                        bytes,
                        content_type,
                    } => {
                        let mut headers = Headers::new();
                        headers.set("content-type", content_type);
                        (200, headers, bytes)
                    }
                    HandlerValue::Container(container) => {
                        match self.serializer.serialize_container(&container) {
                            Ok((bytes, content_type)) => {
                                let mut headers = Headers::new();
                                headers.set("content-type", content_type);
                                (200, headers, bytes)
                            }
                            Err(e) => return self.error_response(&e),
                        }
                    }
                    HandlerValue::Flag(true) => (200, Headers::new(), Vec::new()),
                    HandlerValue::Flag(false) => (404, Headers::new(), Vec::new()),
                };

                response_headers.extend(context.response_headers());
                // Write-once-wins: an explicitly set status overrides
                // the automatic one.
                let status = context.status().unwrap_or(automatic_status);
                (status, response_headers, body)
            }
            Err(e) => self.error_response(&e),
        }
    }

    fn error_response(&self, e: &FrameworkError) -> (u16, Headers, Vec<u8>) {
        let status = e.status_code();
        match e {
            FrameworkError::NotFound
            | FrameworkError::Unauthorized
            | FrameworkError::Timeout { .. } => {
                debug!(kind = e.kind(), status, "request failed");
                (status, Headers::new(), Vec::new())
            }
            other => {
                // Full detail goes to the log; the body carries it only
                // in debug mode.
                error!(kind = other.kind(), error = %other, "request failed");
                let message = if self.debug {
                    other.to_string()
                } else {
                    "An internal error occurred.".to_string()
                };
                let trace = if self.debug {
                    Some(other.to_string())
                } else {
                    None
                };
                let (body, content_type) =
                    self.serializer
                        .serialize_error(other.kind(), &message, trace.as_deref());
                let mut headers = Headers::new();
                headers.set("content-type", content_type);
                (status, headers, body)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefixes = self.prefixes.read().map(|p| p.len()).unwrap_or(0);
        f.debug_struct("Dispatcher")
            .field("prefixes", &prefixes)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

fn split_query(path: &str) -> (&str, &str) {
    match path.split_once('?') {
        Some((path, query)) => (path, query),
        None => (path, ""),
    }
}

fn parse_query(query: &str) -> Params {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn path_nouns(path: &str) -> Vec<String> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
