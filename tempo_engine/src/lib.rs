//! # Tempo Engine
//!
//! An activity-driven event propagation graph. Nodes wrap externally supplied
//! logic, edges carry a fixed positive latency, and the graph advances in
//! discrete steps that only visit nodes with pending work.
//!
//! ## Core Components
//!
//! - **node**: The node logic capability, ready-made adapters, and node records
//! - **calendar**: Earliest-pending-time index used to skip idle nodes
//! - **graph**: Topology, injection, and the step (wavefront) algorithm
//! - **commands**: Mutations requested from inside node logic, applied after a step
//! - **config**: TOML-backed engine settings
//!
//! ## Design Philosophy
//!
//! - **Activity-Driven**: Per-step cost follows the number of active nodes, not graph size
//! - **Causal**: An output produced at `t` over an edge of latency `L` arrives at exactly `t + L`
//! - **Validate-Then-Apply**: A rejected call leaves the graph untouched

pub mod calendar;
pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod node;

pub use calendar::*;
pub use commands::*;
pub use config::*;
pub use error::*;
pub use graph::*;
pub use node::*;

pub use tempo_model::{NodeId, Signal, SimDuration, SimTime};
