//! Per-request execution contexts.

use std::collections::HashMap;

use arbor_capabilities::ContextKit;
use arbor_core::{FrameworkError, FrameworkResult, Headers, TransactionId};
use tracing::warn;

/// Per-request state plus the capability bindings materialized for the
/// request.
///
/// Created at dispatch time, mutated by the handler and framework
/// internals, and destroyed exactly once when the response is finalized.
pub struct ExecutionContext {
    txn_id: TransactionId,
    request_headers: Headers,
    response_headers: Headers,
    response_status: Option<u16>,
    cache_time: Option<u64>,
    default_cache_time: u64,
    prefix: Option<String>,
    cookies: HashMap<String, String>,
    set_cookies: Vec<(String, String)>,
    values: HashMap<String, serde_json::Value>,
    kits: Vec<(String, Box<dyn ContextKit>)>,
    released: bool,
}

impl ExecutionContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        txn_id: TransactionId,
        request_headers: Headers,
        cookies: HashMap<String, String>,
        values: HashMap<String, serde_json::Value>,
        kits: Vec<(String, Box<dyn ContextKit>)>,
        default_cache_time: u64,
    ) -> Self {
        Self {
            txn_id,
            request_headers,
            response_headers: Headers::new(),
            response_status: None,
            cache_time: None,
            default_cache_time,
            prefix: None,
            cookies,
            set_cookies: Vec::new(),
            values,
            kits,
            released: false,
        }
    }

    /// The transaction ID correlating this request's activity.
    #[must_use]
    pub fn txn_id(&self) -> &TransactionId {
        &self.txn_id
    }

    /// The inbound request headers.
    #[must_use]
    pub fn request_headers(&self) -> &Headers {
        &self.request_headers
    }

    /// Headers accumulated for the response.
    #[must_use]
    pub fn response_headers(&self) -> &Headers {
        &self.response_headers
    }

    /// Add a response header.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response_headers.set(name, value);
    }

    /// Set the response status. Write-once-wins: the first explicit set
    /// sticks and later writes are ignored.
    pub fn set_status(&mut self, status: u16) {
        if self.response_status.is_none() {
            self.response_status = Some(status);
        }
    }

    /// The explicitly set response status, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response_status
    }

    /// Lower the response cache-time hint. `None` applies the
    /// configured default; otherwise the minimum of all updates wins.
    pub fn update_cache_time(&mut self, new_time: Option<u64>) {
        match new_time {
            None => self.cache_time = Some(self.default_cache_time),
            Some(time) => match self.cache_time {
                Some(current) if current <= time => {}
                _ => self.cache_time = Some(time),
            },
        }
    }

    /// The effective cache-time hint, if any update was recorded.
    #[must_use]
    pub fn cache_time(&self) -> Option<u64> {
        self.cache_time
    }

    /// The route prefix this request resolved under, once known.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub(crate) fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = Some(prefix.into());
    }

    /// A cookie delivered with the request.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Record a cookie to send with the response.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set_cookies.push((name.into(), value.into()));
    }

    /// Read a value from this context's snapshot of the shared
    /// environment, including any context-local writes.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    /// Write a value visible only within this context. Shared state
    /// meant to survive the request goes through kits and caches.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Access a materialized context-bound kit by name, downcast to its
    /// concrete type.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameworkError::RequiresContext`] failure if no kit
    /// of that name was materialized for this request, or a handler
    /// error if the kit is of a different type than requested.
    pub fn kit_mut<T: 'static>(&mut self, name: &str) -> FrameworkResult<&mut T> {
        let slot = self
            .kits
            .iter_mut()
            .find(|(kit_name, _)| kit_name == name)
            .ok_or_else(|| FrameworkError::RequiresContext {
                name: name.to_string(),
            })?;
        slot.1
            .as_any()
            .downcast_mut::<T>()
            .ok_or_else(|| FrameworkError::handler(format!("kit '{name}' has a different type")))
    }

    /// Names of the kits materialized for this request.
    pub fn kit_names(&self) -> impl Iterator<Item = &str> {
        self.kits.iter().map(|(name, _)| name.as_str())
    }

    /// Run every materialized kit's teardown exactly once and collect
    /// the headers they contribute, plus any recorded cookies.
    pub(crate) fn release(&mut self) -> Headers {
        let mut headers = Headers::new();
        if self.released {
            warn!(txn_id = %self.txn_id, "context released twice");
            return headers;
        }
        self.released = true;

        for (_, mut kit) in self.kits.drain(..) {
            kit.end_context(&mut headers);
        }

        if !self.set_cookies.is_empty() {
            let cookie_header = self
                .set_cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.set("set-cookie", cookie_header);
        }

        headers
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        // Abrupt teardown still runs each kit's teardown exactly once.
        if !self.released {
            warn!(txn_id = %self.txn_id, "context dropped without release");
            let _ = self.release();
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("txn_id", &self.txn_id)
            .field("status", &self.response_status)
            .field("prefix", &self.prefix)
            .field("kits", &self.kits.len())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::tests_support::bare_context;
    use super::*;

    #[test]
    fn status_is_write_once_wins() {
        let mut context = bare_context();
        assert_eq!(context.status(), None);
        context.set_status(202);
        context.set_status(500);
        assert_eq!(context.status(), Some(202));
    }

    #[test]
    fn cache_time_takes_the_minimum() {
        let mut context = bare_context();
        context.update_cache_time(Some(600));
        context.update_cache_time(Some(120));
        context.update_cache_time(Some(900));
        assert_eq!(context.cache_time(), Some(120));
    }

    #[test]
    fn cache_time_none_applies_the_default() {
        let mut context = bare_context();
        context.update_cache_time(None);
        assert_eq!(context.cache_time(), Some(30));
    }

    #[test]
    fn context_values_are_local_writes() {
        let mut context = bare_context();
        assert!(context.value("flag").is_none());
        context.set_value("flag", true);
        assert_eq!(context.value("flag"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn missing_kit_is_a_requires_context_failure() {
        let mut context = bare_context();
        let err = context.kit_mut::<u32>("Cache").unwrap_err();
        assert!(matches!(err, FrameworkError::RequiresContext { .. }));
    }
}
