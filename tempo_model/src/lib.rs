//! # Tempo Model
//!
//! Shared vocabulary for the Tempo workspace - simulation time, node identities,
//! and a general-purpose signal event. This crate holds no engine logic, so
//! domain layers can author node logic against it without pulling in the
//! propagation graph.

pub mod ids;
pub mod signal;
pub mod time;

pub use ids::*;
pub use signal::*;
pub use time::*;
