//! Activity calendar - which nodes need attention, and from when.
//!
//! The calendar maps a node to the earliest time it is known to have
//! undelivered work. It is a wake-up hint, not a copy of the mailbox: it only
//! ever lowers an entry, so it stays a conservative lower bound with O(log n)
//! updates. A second index ordered by time keeps `take_due` and `earliest`
//! proportional to the entries they return.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use tempo_model::{NodeId, SimDuration, SimTime};

/// Earliest-pending-time index over nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<NodeId, SimTime>",
    into = "BTreeMap<NodeId, SimTime>"
)]
pub struct ActivityCalendar {
    entries: BTreeMap<NodeId, SimTime>,
    by_time: BTreeSet<(SimTime, NodeId)>,
}

impl ActivityCalendar {
    /// Create an empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `node` has work no later than `at`.
    ///
    /// Overwrites only when the node is absent or `at` is strictly earlier
    /// than the recorded time. Returns whether the entry changed.
    pub fn note(&mut self, node: &NodeId, at: SimTime) -> bool {
        match self.entries.get_mut(node) {
            Some(current) if at < *current => {
                self.by_time.remove(&(*current, node.clone()));
                self.by_time.insert((at, node.clone()));
                *current = at;
                true
            }
            Some(_) => false,
            None => {
                self.entries.insert(node.clone(), at);
                self.by_time.insert((at, node.clone()));
                true
            }
        }
    }

    /// The recorded time for a node, if any.
    pub fn get(&self, node: &NodeId) -> Option<SimTime> {
        self.entries.get(node).copied()
    }

    /// Check if a node is scheduled.
    pub fn contains(&self, node: &NodeId) -> bool {
        self.entries.contains_key(node)
    }

    /// Remove and return every node due at or before `horizon`, earliest
    /// first and by id within a timestamp.
    pub fn take_due(&mut self, horizon: SimTime) -> Vec<NodeId> {
        let due = match horizon.checked_add(SimDuration::from_micros(1)) {
            Some(first_later) => {
                let later = self.by_time.split_off(&(first_later, NodeId::new("")));
                std::mem::replace(&mut self.by_time, later)
            }
            None => std::mem::take(&mut self.by_time),
        };

        due.into_iter()
            .map(|(_, node)| {
                self.entries.remove(&node);
                node
            })
            .collect()
    }

    /// The earliest time any node is scheduled.
    pub fn earliest(&self) -> Option<SimTime> {
        self.by_time.first().map(|(at, _)| *at)
    }

    /// Number of scheduled nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no node is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(node, earliest time)` entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &SimTime)> {
        self.entries.iter()
    }
}

impl From<BTreeMap<NodeId, SimTime>> for ActivityCalendar {
    fn from(entries: BTreeMap<NodeId, SimTime>) -> Self {
        let by_time = entries
            .iter()
            .map(|(node, at)| (*at, node.clone()))
            .collect();
        Self { entries, by_time }
    }
}

impl From<ActivityCalendar> for BTreeMap<NodeId, SimTime> {
    fn from(calendar: ActivityCalendar) -> Self {
        calendar.entries
    }
}
