//! Parameterized route tables.
//!
//! Routes are ordered rules per HTTP method; resolution tries them in
//! registration order and the first match wins. Registration is safe
//! under concurrency: plugin start-up code runs on its own thread and
//! may race early requests.

use std::collections::HashMap;
use std::sync::RwLock;

use arbor_core::Method;
use tracing::debug;

use crate::handler::{Handler, Params};

/// One segment of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed route template such as `/videos/{id}/play`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a template. Segments wrapped in `{braces}` capture the
    /// matching path segment under that name.
    #[must_use]
    pub fn parse(template: &str) -> Self {
        let segments = template
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .map_or_else(|| Segment::Literal(s.to_string()), |name| {
                        Segment::Param(name.to_string())
                    })
            })
            .collect();
        Self { segments }
    }

    /// Match a request path, returning captured parameters on success.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let nouns: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if nouns.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (segment, noun) in self.segments.iter().zip(&nouns) {
            match segment {
                Segment::Literal(literal) if literal == noun => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*noun).to_string());
                }
            }
        }
        Some(params)
    }
}

struct RouteRule {
    template: RouteTemplate,
    handler: Handler,
    constraints: Params,
}

/// Ordered route tables, one per method.
#[derive(Default)]
pub struct Router {
    rules: RwLock<HashMap<Method, Vec<RouteRule>>>,
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Rules are tried in registration order.
    pub fn connect(&self, template: &str, handler: Handler, method: Method) {
        self.connect_with_constraints(template, handler, method, Params::new());
    }

    /// Register a route with fixed parameters delivered to the handler
    /// on every match. Captured segments and query arguments override
    /// them.
    pub fn connect_with_constraints(
        &self,
        template: &str,
        handler: Handler,
        method: Method,
        constraints: Params,
    ) {
        debug!(template, %method, "connecting route");
        let rule = RouteRule {
            template: RouteTemplate::parse(template),
            handler,
            constraints,
        };
        if let Ok(mut rules) = self.rules.write() {
            rules.entry(method).or_default().push(rule);
        }
    }

    /// Resolve a path against the table for `method`; first match wins.
    #[must_use]
    pub fn match_route(&self, path: &str, method: Method) -> Option<(Handler, Params)> {
        let rules = self.rules.read().ok()?;
        let table = rules.get(&method)?;
        for rule in table {
            if let Some(captured) = rule.template.match_path(path) {
                let mut params = rule.constraints.clone();
                for (name, value) in captured {
                    params.insert(name, value);
                }
                return Some((rule.handler.clone(), params));
            }
        }
        None
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .rules
            .read()
            .map(|rules| rules.values().map(Vec::len).sum::<usize>())
            .unwrap_or(0);
        f.debug_struct("Router").field("rules", &count).finish()
    }
}
