//! Handler types and the body serialization seam.
//!
//! The markup/object serialization layer lives outside this workspace;
//! [`BodySerializer`] is its narrow interface. The dispatcher treats the
//! produced body as opaque bytes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arbor_core::FrameworkResult;

use crate::context::ExecutionContext;

/// Route and query parameters delivered to a handler.
pub type Params = HashMap<String, String>;

/// A listable result container.
///
/// Containers are the one result shape the dispatcher understands beyond
/// opaque bodies: it can slice them for paging and annotate their total
/// size, so handlers never implement paging themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    /// The contained items, already shaped for serialization.
    pub items: Vec<serde_json::Value>,
    /// Container-level attributes (title, identifier, ...).
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Container {
    /// An empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item.
    pub fn append(&mut self, item: serde_json::Value) {
        self.items.push(item);
    }

    /// Set a container-level attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the container has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What a handler returns to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerValue {
    /// No result; the dispatcher answers 404 with an empty body.
    None,
    /// A plain text body.
    Text(String),
    /// Opaque bytes with their content type.
    Data {
        /// The body bytes.
        bytes: Vec<u8>,
        /// The `Content-Type` to send.
        content_type: String,
    },
    /// A listable container, serialized by the body serializer.
    Container(Container),
    /// Existence toggle: `true` answers 200, `false` answers 404.
    Flag(bool),
}

/// A registered request handler.
pub type Handler =
    Arc<dyn Fn(&mut ExecutionContext, &Params) -> FrameworkResult<HandlerValue> + Send + Sync>;

/// A private framework handler, tried in registration order; the first
/// one returning `Some` wins.
pub type PrivateHandler = Arc<
    dyn Fn(&[String], &Params, &mut ExecutionContext) -> FrameworkResult<Option<HandlerValue>>
        + Send
        + Sync,
>;

/// The serialization collaborator interface.
///
/// Implementations turn handler return values into wire bodies; the
/// dispatcher treats the result as opaque.
pub trait BodySerializer: Send + Sync {
    /// Serialize a container into `(body, content_type)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be represented.
    fn serialize_container(&self, container: &Container) -> FrameworkResult<(Vec<u8>, String)>;

    /// Serialize a structured error body.
    fn serialize_error(
        &self,
        kind: &str,
        message: &str,
        trace: Option<&str>,
    ) -> (Vec<u8>, String);
}

/// The default serializer: containers and error bodies as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBodySerializer;

impl BodySerializer for JsonBodySerializer {
    fn serialize_container(&self, container: &Container) -> FrameworkResult<(Vec<u8>, String)> {
        let mut object = serde_json::Map::new();
        for (name, value) in &container.attributes {
            object.insert(name.clone(), value.clone());
        }
        object.insert("size".to_string(), container.items.len().into());
        object.insert(
            "items".to_string(),
            serde_json::Value::Array(container.items.clone()),
        );
        let bytes = serde_json::to_vec(&serde_json::Value::Object(object))
            .map_err(|e| arbor_core::FrameworkError::handler(e.to_string()))?;
        Ok((bytes, "application/json".to_string()))
    }

    fn serialize_error(
        &self,
        kind: &str,
        message: &str,
        trace: Option<&str>,
    ) -> (Vec<u8>, String) {
        let mut object = serde_json::Map::new();
        object.insert("error".to_string(), kind.into());
        object.insert("message".to_string(), message.into());
        if let Some(trace) = trace {
            object.insert("trace".to_string(), trace.into());
        }
        let body = serde_json::Value::Object(object).to_string().into_bytes();
        (body, "application/json".to_string())
    }
}
