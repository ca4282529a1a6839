//! The graph's bookkeeping for a single node.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use tempo_model::{NodeId, SimDuration, SimTime};

use super::SharedLogic;

/// Logic handle, outgoing edges, and mailbox for one node.
pub(crate) struct NodeRecord<E> {
    pub(crate) logic: SharedLogic<E>,

    /// Destination -> latency. Ordered so propagation order is reproducible.
    pub(crate) edges: BTreeMap<NodeId, SimDuration>,

    /// Arrival time -> events due at that time (unordered within a bucket).
    pub(crate) mailbox: BTreeMap<SimTime, Vec<E>>,
}

impl<E> NodeRecord<E> {
    pub(crate) fn new(logic: SharedLogic<E>) -> Self {
        Self {
            logic,
            edges: BTreeMap::new(),
            mailbox: BTreeMap::new(),
        }
    }

    /// Upsert the edge to `destination`; last write wins.
    pub(crate) fn set_edge(&mut self, destination: NodeId, latency: SimDuration) {
        self.edges.insert(destination, latency);
    }

    /// Copy of the outgoing edges, safe to hold while the graph mutates.
    pub(crate) fn edge_snapshot(&self) -> Vec<(NodeId, SimDuration)> {
        self.edges
            .iter()
            .map(|(id, latency)| (id.clone(), *latency))
            .collect()
    }

    /// Append events to the bucket for `at`.
    pub(crate) fn deliver(&mut self, at: SimTime, events: impl IntoIterator<Item = E>) {
        self.mailbox.entry(at).or_default().extend(events);
    }

    /// Mailbox timestamps at or before `horizon`, ascending.
    pub(crate) fn due_times(&self, horizon: SimTime) -> Vec<SimTime> {
        self.mailbox.range(..=horizon).map(|(at, _)| *at).collect()
    }

    /// Remove and return the bucket for `at`.
    pub(crate) fn take_batch(&mut self, at: SimTime) -> Vec<E> {
        self.mailbox.remove(&at).unwrap_or_default()
    }

    /// The earliest timestamp strictly after `horizon`.
    pub(crate) fn earliest_after(&self, horizon: SimTime) -> Option<SimTime> {
        self.mailbox
            .range((Excluded(horizon), Unbounded))
            .map(|(at, _)| *at)
            .next()
    }
}
