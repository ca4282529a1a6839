//! Node module - the pluggable logic capability and the graph's per-node record.
//!
//! A node consists of:
//! - **Logic**: An externally owned `process(events) -> events` capability
//! - **Edges**: Outgoing destinations with their latencies
//! - **Mailbox**: Pending event batches keyed by arrival time

mod adapters;
mod logic;
mod record;

pub use adapters::*;
pub use logic::*;
pub(crate) use record::NodeRecord;
