//! Case-insensitive header maps and the framework header names.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header carrying the transaction ID assigned by the host server.
pub const TRANSACTION_ID: &str = "x-arbor-transaction-id";

/// First item index requested for a paged container.
pub const CONTAINER_START: &str = "x-arbor-container-start";

/// Maximum number of items requested for a paged container.
pub const CONTAINER_SIZE: &str = "x-arbor-container-size";

/// Total (pre-slice) container size, annotated on paged responses.
pub const CONTAINER_TOTAL_SIZE: &str = "x-arbor-container-total-size";

/// Platform identifier reported by the connecting client.
pub const CLIENT_PLATFORM: &str = "x-arbor-client-platform";

/// Client capability declaration (`name=v1,v2;name2=v3`).
pub const CLIENT_CAPABILITIES: &str = "x-arbor-client-capabilities";

/// A header map with case-insensitive names.
///
/// Names are folded to lower case on insertion, matching how the transport
/// collaborator delivers them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    map: HashMap<String, String>,
}

impl Headers {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a header by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_ascii_lowercase())
    }

    /// Insert a header, replacing any existing value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Remove a header, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.map.remove(&name.to_ascii_lowercase())
    }

    /// Merge another header map into this one. Existing names are
    /// overwritten by `other`.
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in &other.map {
            self.map.insert(name.clone(), value.clone());
        }
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Parse a header value as an unsigned integer, if present and valid.
    #[must_use]
    pub fn get_usize(&self, name: &str) -> Option<usize> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// The container paging window, if the request carries both hints.
    #[must_use]
    pub fn paging_window(&self) -> Option<(usize, usize)> {
        match (
            self.get_usize(CONTAINER_START),
            self.get_usize(CONTAINER_SIZE),
        ) {
            (Some(start), Some(size)) => Some((start, size)),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("X-Arbor-Transaction-Id", "abc");
        assert_eq!(headers.get("x-arbor-transaction-id"), Some("abc"));
        assert_eq!(headers.get("X-ARBOR-TRANSACTION-ID"), Some("abc"));
        assert!(headers.contains(TRANSACTION_ID));
    }

    #[test]
    fn paging_window_requires_both_hints() {
        let mut headers = Headers::new();
        headers.set(CONTAINER_START, "5");
        assert_eq!(headers.paging_window(), None);
        headers.set(CONTAINER_SIZE, "10");
        assert_eq!(headers.paging_window(), Some((5, 10)));
    }

    #[test]
    fn malformed_paging_hint_is_ignored() {
        let mut headers = Headers::new();
        headers.set(CONTAINER_START, "five");
        headers.set(CONTAINER_SIZE, "10");
        assert_eq!(headers.paging_window(), None);
    }
}
