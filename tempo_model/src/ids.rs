//! Node identities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, globally unique identity of a node logic capability.
///
/// The propagation graph uses this string as its only lookup key, so two
/// capabilities must never share one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node ID from a chosen name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Create a fresh node ID from a random UUID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
