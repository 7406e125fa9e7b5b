//! Request correlation context.
//!
//! Every log line emitted while a request is being handled carries the
//! transaction ID, so one request's activity can be followed across the
//! dispatcher, task pool, and cache components.

use tracing::Span;

/// Correlation context for one logical operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    component: String,
    operation: Option<String>,
    txn_id: Option<String>,
}

impl RequestContext {
    /// Create a context rooted at a component name.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            operation: None,
            txn_id: None,
        }
    }

    /// Name the operation being performed.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Attach the transaction ID of the request being handled.
    #[must_use]
    pub fn with_txn_id(mut self, txn_id: impl Into<String>) -> Self {
        self.txn_id = Some(txn_id.into());
        self
    }

    /// Build a span carrying the context fields.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            component = %self.component,
            operation = self.operation.as_deref().unwrap_or(""),
            txn_id = self.txn_id.as_deref().unwrap_or(""),
        )
    }
}
