//! End-to-end dispatch tests: resolution order, response construction,
//! error mapping, paging, and the context lifecycle around handlers.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arbor_capabilities::{ContextKit, Kit, PluginManifest, Policy};
use arbor_config::RuntimeConfig;
use arbor_core::{FrameworkError, Headers, RequestMeta, TransactionId, headers};
use arbor_runtime::{Container, Handler, HandlerValue, PrefixMetadata, Runtime};

struct TracingKit {
    teardowns: Arc<AtomicUsize>,
}

struct TracingInstance {
    teardowns: Arc<AtomicUsize>,
}

impl Kit for TracingKit {
    fn name(&self) -> &str {
        "Tracing"
    }

    fn requires_context(&self, _request: &RequestMeta) -> bool {
        true
    }

    fn materialize(&self, _txn_id: &TransactionId) -> Box<dyn ContextKit> {
        Box::new(TracingInstance {
            teardowns: Arc::clone(&self.teardowns),
        })
    }
}

impl ContextKit for TracingInstance {
    fn as_any(&mut self) -> &mut dyn Any {
        self
    }

    fn end_context(&mut self, response_headers: &mut Headers) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        response_headers.set("x-tracing", "released");
    }
}

fn runtime_with_kit(teardowns: &Arc<AtomicUsize>) -> Runtime {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RuntimeConfig::default();
    config.cache.root = dir.path().join("Caches");
    config.task_pool.maximum_threads = 2;
    config.task_pool.priority_threads = 1;

    let policy = Policy::builder("standard")
        .contextual_kit(Arc::new(TracingKit {
            teardowns: Arc::clone(teardowns),
        }))
        .build();
    Runtime::new(config, policy).unwrap()
}

fn runtime() -> Runtime {
    runtime_with_kit(&Arc::new(AtomicUsize::new(0)))
}

fn text_handler(text: &'static str) -> Handler {
    Arc::new(move |_, _| Ok(HandlerValue::Text(text.to_string())))
}

#[test]
fn root_path_answers_ok() {
    let runtime = runtime();
    let response = runtime.handle_request("/", "GET", Headers::new());
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"OK\n");
}

#[test]
fn unmatched_path_is_404_with_empty_body() {
    let runtime = runtime();
    let response = runtime.handle_request("/nowhere/at/all", "GET", Headers::new());
    assert_eq!(response.status, 404);
    assert!(response.body.is_empty());
}

#[test]
fn prefix_handlers_match_the_whole_leading_path() {
    let runtime = runtime();
    runtime.dispatcher().register_prefix(
        "/video/example",
        text_handler("prefix root"),
        PrefixMetadata::named("Example"),
    );

    let response = runtime.handle_request("/video/example", "GET", Headers::new());
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"prefix root");
    assert_eq!(response.headers.get("content-type"), Some("text/plain"));
}

#[test]
fn routes_capture_parameters_and_merge_query_args() {
    let runtime = runtime();
    runtime.dispatcher().register_route(
        "/items/{id}",
        Arc::new(|_, params| {
            Ok(HandlerValue::Text(format!(
                "{}:{}",
                params.get("id").cloned().unwrap_or_default(),
                params.get("mode").cloned().unwrap_or_default(),
            )))
        }),
        arbor_core::Method::Get,
    );

    let response = runtime.handle_request("/items/42?mode=full", "GET", Headers::new());
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"42:full");
}

#[test]
fn route_tables_are_per_method() {
    let runtime = runtime();
    runtime.dispatcher().register_route(
        "/items/{id}",
        text_handler("put"),
        arbor_core::Method::Put,
    );
    assert_eq!(
        runtime.handle_request("/items/1", "GET", Headers::new()).status,
        404
    );
    assert_eq!(
        runtime.handle_request("/items/1", "PUT", Headers::new()).status,
        200
    );
}

#[test]
fn management_prefix_lists_registered_prefixes() {
    let runtime = runtime();
    runtime.dispatcher().register_prefix(
        "/video/example",
        text_handler("x"),
        PrefixMetadata::named("Example Channel"),
    );

    let response = runtime.handle_request("/:/prefixes", "GET", Headers::new());
    assert_eq!(response.status, 200);
    let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(value["size"], 1);
    assert_eq!(value["items"][0]["key"], "/video/example");
    assert_eq!(value["items"][0]["name"], "Example Channel");
}

#[test]
fn containers_page_when_the_request_asks() {
    let runtime = runtime();
    runtime.dispatcher().register_route(
        "/feeds",
        Arc::new(|_, _| {
            let mut container = Container::new();
            for index in 0..10 {
                container.append(serde_json::json!({ "index": index }));
            }
            Ok(HandlerValue::Container(container))
        }),
        arbor_core::Method::Get,
    );

    let mut request_headers = Headers::new();
    request_headers.set(headers::CONTAINER_START, "4");
    request_headers.set(headers::CONTAINER_SIZE, "3");
    let response = runtime.handle_request("/feeds", "GET", request_headers);

    assert_eq!(response.status, 200);
    assert_eq!(response.headers.get(headers::CONTAINER_TOTAL_SIZE), Some("10"));
    let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(value["size"], 3);
    assert_eq!(value["total_size"], 10);
    assert_eq!(value["items"][0]["index"], 4);
    assert_eq!(value["items"][2]["index"], 6);
}

#[test]
fn handler_errors_become_500_with_a_generic_body() {
    let runtime = runtime();
    runtime.dispatcher().register_route(
        "/broken",
        Arc::new(|_, _| Err(FrameworkError::handler("secret database string"))),
        arbor_core::Method::Get,
    );

    let response = runtime.handle_request("/broken", "GET", Headers::new());
    assert_eq!(response.status, 500);
    let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(value["error"], "HandlerError");
    // Non-debug mode never leaks the real message.
    assert_eq!(value["message"], "An internal error occurred.");
    assert!(value.get("trace").is_none());
}

#[test]
fn debug_mode_returns_full_detail() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RuntimeConfig::default();
    config.cache.root = dir.path().join("Caches");
    config.debug = true;
    config.task_pool.maximum_threads = 2;
    config.task_pool.priority_threads = 1;
    let runtime = Runtime::new(config, Policy::builder("standard").build()).unwrap();

    runtime.dispatcher().register_route(
        "/broken",
        Arc::new(|_, _| Err(FrameworkError::handler("exact failure detail"))),
        arbor_core::Method::Get,
    );

    let response = runtime.handle_request("/broken", "GET", Headers::new());
    let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert!(value["message"].as_str().unwrap().contains("exact failure detail"));
    assert!(value.get("trace").is_some());
}

#[test]
fn panicking_handlers_are_contained_as_500() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let runtime = runtime_with_kit(&teardowns);
    runtime.dispatcher().register_route(
        "/panic",
        Arc::new(|_, _| panic!("handler exploded")),
        arbor_core::Method::Get,
    );

    let response = runtime.handle_request("/panic", "GET", Headers::new());
    assert_eq!(response.status, 500);
    // The context was still released and each teardown ran exactly once.
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);

    // The worker is still healthy for the next request.
    let response = runtime.handle_request("/", "GET", Headers::new());
    assert_eq!(response.status, 200);
}

#[test]
fn timeouts_map_to_504() {
    let runtime = runtime();
    runtime.dispatcher().register_route(
        "/slow",
        Arc::new(|_, _| Err(FrameworkError::Timeout { seconds: 20 })),
        arbor_core::Method::Get,
    );

    let response = runtime.handle_request("/slow", "GET", Headers::new());
    assert_eq!(response.status, 504);
    assert!(response.body.is_empty());
}

#[test]
fn unauthorized_sheds_headers_mutated_in_the_failed_context() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let runtime = runtime_with_kit(&teardowns);
    runtime.dispatcher().register_route(
        "/secure",
        Arc::new(|context, _| {
            context.set_header("x-partial-state", "leaky");
            context.set_cookie("session", "half-built");
            Err(FrameworkError::Unauthorized)
        }),
        arbor_core::Method::Get,
    );

    let response = runtime.handle_request("/secure", "GET", Headers::new());
    assert_eq!(response.status, 401);
    assert!(response.body.is_empty());
    assert!(response.headers.is_empty());
    // Teardown still ran exactly once.
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn kit_teardown_headers_reach_successful_responses() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let runtime = runtime_with_kit(&teardowns);
    runtime.dispatcher().register_prefix(
        "/app",
        text_handler("ok"),
        PrefixMetadata::named("App"),
    );

    let response = runtime.handle_request("/app", "GET", Headers::new());
    assert_eq!(response.headers.get("x-tracing"), Some("released"));
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn explicit_status_wins_once() {
    let runtime = runtime();
    runtime.dispatcher().register_route(
        "/created",
        Arc::new(|context, _| {
            context.set_status(201);
            context.set_status(500);
            Ok(HandlerValue::Text("made".to_string()))
        }),
        arbor_core::Method::Get,
    );

    let response = runtime.handle_request("/created", "GET", Headers::new());
    assert_eq!(response.status, 201);
}

#[test]
fn named_functions_are_callable_under_a_prefix() {
    let runtime = runtime();
    runtime.dispatcher().register_prefix(
        "/video/example",
        text_handler("root"),
        PrefixMetadata::named("Example"),
    );
    runtime.dispatcher().register_function(
        "Search",
        Arc::new(|_, params| {
            Ok(HandlerValue::Text(format!(
                "searched:{}",
                params.get("query").cloned().unwrap_or_default()
            )))
        }),
    );

    let response = runtime.handle_request(
        "/video/example/:/function/Search?query=rust",
        "GET",
        Headers::new(),
    );
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"searched:rust");

    // Extensions on the function name are stripped.
    let response = runtime.handle_request(
        "/video/example/:/function/Search.json?query=rust",
        "GET",
        Headers::new(),
    );
    assert_eq!(response.status, 200);
}

#[test]
fn private_handlers_run_in_registration_order() {
    let runtime = runtime();
    runtime
        .dispatcher()
        .register_private_handler(Arc::new(|nouns, _, _| {
            if nouns.first().map(String::as_str) == Some("declined") {
                Ok(None)
            } else {
                Ok(Some(HandlerValue::Text("first".to_string())))
            }
        }));
    runtime
        .dispatcher()
        .register_private_handler(Arc::new(|_, _, _| {
            Ok(Some(HandlerValue::Text("second".to_string())))
        }));

    let response = runtime.handle_request("/:/anything", "GET", Headers::new());
    assert_eq!(response.body, b"first");

    let response = runtime.handle_request("/:/declined", "GET", Headers::new());
    assert_eq!(response.body, b"second");
}

#[test]
fn flags_toggle_between_200_and_404() {
    let runtime = runtime();
    runtime.dispatcher().register_route(
        "/present",
        Arc::new(|_, _| Ok(HandlerValue::Flag(true))),
        arbor_core::Method::Get,
    );
    runtime.dispatcher().register_route(
        "/absent",
        Arc::new(|_, _| Ok(HandlerValue::Flag(false))),
        arbor_core::Method::Get,
    );

    assert_eq!(runtime.handle_request("/present", "GET", Headers::new()).status, 200);
    assert_eq!(runtime.handle_request("/absent", "GET", Headers::new()).status, 404);
}

#[test]
fn registration_races_early_requests_safely() {
    // Plugin start-up runs on its own thread and may register handlers
    // while requests are already arriving.
    let runtime = Arc::new(runtime());
    let registrar = {
        let runtime = Arc::clone(&runtime);
        std::thread::spawn(move || {
            for index in 0..50 {
                runtime.dispatcher().register_route(
                    &format!("/gen/{index}"),
                    text_handler("gen"),
                    arbor_core::Method::Get,
                );
            }
        })
    };

    for _ in 0..50 {
        let response = runtime.handle_request("/gen/0", "GET", Headers::new());
        assert!(response.status == 200 || response.status == 404);
    }
    registrar.join().unwrap();

    assert_eq!(
        runtime.handle_request("/gen/49", "GET", Headers::new()).status,
        200
    );
}

#[test]
fn hardened_policy_aborts_plugin_load_on_disallowed_import() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RuntimeConfig::default();
    config.cache.root = dir.path().join("Caches");
    config.task_pool.maximum_threads = 2;
    config.task_pool.priority_threads = 1;

    let policy = Policy::builder("standard")
        .allow_import("json")
        .hardened(true)
        .build();
    let runtime = Runtime::new(config, policy).unwrap();

    let mut manifest = PluginManifest::minimal("com.example.bad", "main");
    manifest.modules[0].imports.push("sockets".to_string());
    assert!(runtime.load_plugin(&manifest).is_err());

    let good = PluginManifest::minimal("com.example.good", "main");
    assert!(runtime.load_plugin(&good).unwrap().is_empty());
}

#[test]
fn global_kits_resolve_outside_requests_but_contextual_kits_do_not() {
    struct GlobalKit;
    impl Kit for GlobalKit {
        fn name(&self) -> &str {
            "Platform"
        }
        fn requires_context(&self, _request: &RequestMeta) -> bool {
            false
        }
        fn materialize(&self, _txn_id: &TransactionId) -> Box<dyn ContextKit> {
            unreachable!("global kits are never materialized")
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let mut config = RuntimeConfig::default();
    config.cache.root = dir.path().join("Caches");
    config.task_pool.maximum_threads = 2;
    config.task_pool.priority_threads = 1;

    let teardowns = Arc::new(AtomicUsize::new(0));
    let policy = Policy::builder("standard")
        .global_kit(Arc::new(GlobalKit))
        .contextual_kit(Arc::new(TracingKit {
            teardowns: Arc::clone(&teardowns),
        }))
        .build();
    let runtime = Runtime::new(config, policy).unwrap();

    assert!(runtime.global_kit("Platform").is_ok());
    assert!(matches!(
        runtime.global_kit("Tracing"),
        Err(FrameworkError::RequiresContext { .. })
    ));
    assert!(matches!(
        runtime.global_kit("Nonexistent"),
        Err(FrameworkError::RequiresContext { .. })
    ));
}
