//! Error taxonomy for the propagation engine.
//!
//! Every failure is caller-recoverable: a rejected call mutates nothing, so
//! the caller may skip it, log it, and carry on.

use serde::Serialize;

use tempo_model::{NodeId, SimDuration};

/// Errors returned by graph operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum PropagationError {
    /// Edge registration with a latency of zero or less.
    #[error("invalid latency {latency} on edge {from} -> {to}: latency must be strictly positive")]
    InvalidLatency {
        from: NodeId,
        to: NodeId,
        latency: SimDuration,
    },

    /// A step (or configured default step) of zero or less.
    #[error("invalid step duration {dt}: must be strictly positive")]
    InvalidStepDuration { dt: SimDuration },

    /// Injection addressed to a node that no edge has registered.
    #[error("unknown target node {0}")]
    UnknownTarget(NodeId),

    /// Injection attempted before any topology exists.
    #[error("graph has no nodes yet")]
    EmptyGraph,
}

/// Errors raised while loading [`crate::EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config text is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The config parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(#[from] PropagationError),
}
