//! Propagation Graph - the core data structure for timed event propagation.
//!
//! The graph owns the node table, the activity calendar, and the shared
//! clock. A step works as a wavefront:
//! 1. **Seed**: Take every node the calendar says is due by the horizon
//! 2. **Drain**: Visit queued nodes until the queue is empty
//! 3. **Deliver**: Feed each due mailbox bucket, oldest first, to the node's logic
//! 4. **Propagate**: Schedule outputs at `trigger time + edge latency`; enqueue
//!    the destination if that is within the horizon, otherwise mark it in the calendar
//! 5. **Re-arm**: Put the node's first post-horizon bucket back in the calendar
//! 6. **Advance**: Move the clock to the horizon and apply deferred commands

use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tracing::{debug, warn};

use tempo_model::{NodeId, SimDuration, SimTime};

use crate::calendar::ActivityCalendar;
use crate::commands::{Command, DeferredCommands};
use crate::config::EngineConfig;
use crate::error::PropagationError;
use crate::node::{NodeRecord, SharedLogic};

/// An outgoing edge as seen by neighbor inspection.
pub struct Neighbor<E> {
    /// Logic registered at the edge's destination.
    pub logic: SharedLogic<E>,
    /// Delay added to the triggering timestamp when events cross this edge.
    pub latency: SimDuration,
}

impl<E> Clone for Neighbor<E> {
    fn clone(&self) -> Self {
        Self {
            logic: Rc::clone(&self.logic),
            latency: self.latency,
        }
    }
}

impl<E> std::fmt::Debug for Neighbor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neighbor")
            .field("id", self.logic.id())
            .field("latency", &self.latency)
            .finish()
    }
}

/// Iterator over a snapshot of a node's outgoing edges.
///
/// The snapshot is detached from the graph, and cloning the iterator
/// restarts the walk from the clone point.
pub struct Neighbors<E> {
    inner: std::vec::IntoIter<Neighbor<E>>,
}

impl<E> Iterator for Neighbors<E> {
    type Item = Neighbor<E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<E> ExactSizeIterator for Neighbors<E> {}

impl<E> Clone for Neighbors<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// What a single step did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepReport {
    /// The clock value after the step.
    pub horizon: SimTime,

    /// Nodes taken from the calendar to start the wavefront.
    pub seeded: usize,

    /// Node visits, including visits that found nothing due.
    pub visits: usize,

    /// Batches handed to node logic.
    pub deliveries: usize,

    /// Output batches appended to a destination mailbox.
    pub propagated: usize,

    /// Deferred commands applied after the wavefront drained.
    pub deferred_applied: usize,

    /// Deferred commands that failed validation.
    pub rejected: Vec<PropagationError>,
}

/// The active work queue of one step, deduplicated by node.
#[derive(Default)]
struct Wavefront {
    queue: VecDeque<NodeId>,
    queued: HashSet<NodeId>,
}

impl Wavefront {
    /// Enqueue unless already waiting. A node that has left the queue may
    /// come back.
    fn push(&mut self, node: NodeId) -> bool {
        if self.queued.insert(node.clone()) {
            self.queue.push_back(node);
            true
        } else {
            false
        }
    }

    fn pop(&mut self) -> Option<NodeId> {
        let node = self.queue.pop_front()?;
        self.queued.remove(&node);
        Some(node)
    }
}

/// A directed graph of node logic joined by latency-weighted edges.
pub struct PropagationGraph<E> {
    /// Shared simulation clock; only ever moves forward by a step's `dt`.
    clock: SimTime,

    nodes: HashMap<NodeId, NodeRecord<E>>,

    /// Earliest pending time per node, for nodes not currently in a wavefront.
    calendar: ActivityCalendar,

    deferred: DeferredCommands<E>,

    config: EngineConfig,
}

impl<E: Clone> PropagationGraph<E> {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an empty graph whose clock starts at `config.start_time`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            clock: config.start_time,
            nodes: HashMap::new(),
            calendar: ActivityCalendar::new(),
            deferred: DeferredCommands::new(),
            config,
        }
    }

    // ── Topology ─────────────────────────────────────────

    /// Register or update the edge `source -> destination`.
    ///
    /// Records for both ends are created on first sight. Registering the
    /// same pair again only replaces the latency.
    pub fn connect(
        &mut self,
        source: &SharedLogic<E>,
        destination: &SharedLogic<E>,
        latency: SimDuration,
    ) -> Result<(), PropagationError> {
        if !latency.is_positive() {
            return Err(PropagationError::InvalidLatency {
                from: source.id().clone(),
                to: destination.id().clone(),
                latency,
            });
        }

        self.ensure_node(source);
        self.ensure_node(destination);
        if let Some(record) = self.nodes.get_mut(source.id()) {
            record.set_edge(destination.id().clone(), latency);
        }

        debug!(from = %source.id(), to = %destination.id(), %latency, "Edge registered");
        Ok(())
    }

    fn ensure_node(&mut self, logic: &SharedLogic<E>) {
        match self.nodes.entry(logic.id().clone()) {
            Entry::Occupied(entry) => {
                if !same_logic(&entry.get().logic, logic) {
                    warn!(
                        node = %logic.id(),
                        "Node id already bound to other logic; keeping the original"
                    );
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(NodeRecord::new(Rc::clone(logic)));
            }
        }
    }

    /// Snapshot of the outgoing edges of `source`; empty if unknown.
    pub fn neighbors(&self, source: &NodeId) -> Neighbors<E> {
        let snapshot: Vec<Neighbor<E>> = self
            .nodes
            .get(source)
            .map(|record| {
                record
                    .edges
                    .iter()
                    .filter_map(|(destination, latency)| {
                        self.nodes.get(destination).map(|target| Neighbor {
                            logic: Rc::clone(&target.logic),
                            latency: *latency,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Neighbors {
            inner: snapshot.into_iter(),
        }
    }

    // ── Injection ────────────────────────────────────────

    /// Deliver `event` to a registered node, scheduled for `at`.
    pub fn inject(
        &mut self,
        target: &NodeId,
        at: SimTime,
        event: E,
    ) -> Result<(), PropagationError> {
        if self.nodes.is_empty() {
            return Err(PropagationError::EmptyGraph);
        }
        let record = self
            .nodes
            .get_mut(target)
            .ok_or_else(|| PropagationError::UnknownTarget(target.clone()))?;

        record.deliver(at, std::iter::once(event));
        self.calendar.note(target, at);

        debug!(node = %target, %at, "Event injected");
        Ok(())
    }

    // ── Stepping ─────────────────────────────────────────

    /// Advance the clock by `dt`, processing everything due up to the new time.
    pub fn step(&mut self, dt: SimDuration) -> Result<StepReport, PropagationError> {
        if !dt.is_positive() {
            return Err(PropagationError::InvalidStepDuration { dt });
        }

        let horizon = self
            .clock
            .checked_add(dt)
            .ok_or(PropagationError::InvalidStepDuration { dt })?;
        let mut report = StepReport {
            horizon,
            ..StepReport::default()
        };

        let mut wave = Wavefront::default();
        for node in self.calendar.take_due(horizon) {
            wave.push(node);
            report.seeded += 1;
        }

        while let Some(node) = wave.pop() {
            self.visit(&node, horizon, &mut wave, &mut report);
        }

        self.clock = horizon;

        let (applied, rejected) = self.apply_commands();
        report.deferred_applied = applied;
        report.rejected = rejected;

        debug!(
            %horizon,
            seeded = report.seeded,
            visits = report.visits,
            deliveries = report.deliveries,
            propagated = report.propagated,
            "Step complete"
        );
        Ok(report)
    }

    /// Step by the configured default duration.
    pub fn step_default(&mut self) -> Result<StepReport, PropagationError> {
        self.step(self.config.default_step)
    }

    /// Step until the clock reads `target`.
    pub fn run_until(&mut self, target: SimTime) -> Result<StepReport, PropagationError> {
        self.step(target - self.clock)
    }

    fn visit(
        &mut self,
        node: &NodeId,
        horizon: SimTime,
        wave: &mut Wavefront,
        report: &mut StepReport,
    ) {
        let Some(record) = self.nodes.get(node) else {
            return;
        };
        let due = record.due_times(horizon);
        let logic = Rc::clone(&record.logic);
        let edges = record.edge_snapshot();
        report.visits += 1;

        if self.config.trace_visits {
            debug!(%node, batches = due.len(), %horizon, "Visiting node");
        }

        for at in due {
            let Some(record) = self.nodes.get_mut(node) else {
                break;
            };
            // Removed before processing so a timestamp is never replayed.
            let batch = record.take_batch(at);
            report.deliveries += 1;

            let outputs = logic.process(batch);
            if outputs.is_empty() {
                continue;
            }

            for (destination, latency) in &edges {
                // Delay counts from the triggering timestamp, not the clock.
                let Some(arrival) = at.checked_add(*latency) else {
                    warn!(
                        from = %node,
                        to = %destination,
                        %at,
                        %latency,
                        "Arrival falls past the end of the clock, dropping"
                    );
                    continue;
                };
                let Some(target) = self.nodes.get_mut(destination) else {
                    continue;
                };
                target.deliver(arrival, outputs.iter().cloned());
                report.propagated += 1;

                if arrival <= horizon {
                    wave.push(destination.clone());
                } else {
                    self.calendar.note(destination, arrival);
                }
            }
        }

        if let Some(next) = self
            .nodes
            .get(node)
            .and_then(|record| record.earliest_after(horizon))
        {
            self.calendar.note(node, next);
        }
    }

    // ── Deferred commands ────────────────────────────────

    /// Handle for queueing mutations from inside node logic.
    pub fn deferred(&self) -> DeferredCommands<E> {
        self.deferred.clone()
    }

    /// Apply queued commands now. Returns the ones that were rejected.
    pub fn apply_deferred(&mut self) -> Vec<PropagationError> {
        self.apply_commands().1
    }

    fn apply_commands(&mut self) -> (usize, Vec<PropagationError>) {
        let mut applied = 0;
        let mut rejected = Vec::new();

        for command in self.deferred.drain() {
            let result = match command {
                Command::Connect {
                    source,
                    destination,
                    latency,
                } => self.connect(&source, &destination, latency),
                Command::Inject { target, at, event } => self.inject(&target, at, event),
            };

            match result {
                Ok(()) => applied += 1,
                Err(err) => {
                    warn!(%err, "Deferred command rejected");
                    rejected.push(err);
                }
            }
        }

        (applied, rejected)
    }

    // ── Inspection ───────────────────────────────────────

    /// Current value of the shared clock.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// The configuration this graph was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of registered edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|record| record.edges.len()).sum()
    }

    /// Check if a node is registered.
    pub fn contains(&self, node: &NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// The logic registered under `node`.
    pub fn logic(&self, node: &NodeId) -> Option<SharedLogic<E>> {
        self.nodes.get(node).map(|record| Rc::clone(&record.logic))
    }

    /// Timestamps with undelivered events for `node`, ascending.
    pub fn pending_times(&self, node: &NodeId) -> Vec<SimTime> {
        self.nodes
            .get(node)
            .map(|record| record.mailbox.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Copy of the events waiting for `node` at exactly `at`.
    pub fn pending_events(&self, node: &NodeId, at: SimTime) -> Vec<E> {
        self.nodes
            .get(node)
            .and_then(|record| record.mailbox.get(&at))
            .cloned()
            .unwrap_or_default()
    }

    /// The calendar entry for `node`.
    pub fn scheduled_at(&self, node: &NodeId) -> Option<SimTime> {
        self.calendar.get(node)
    }

    /// Read-only view of the activity calendar.
    pub fn calendar(&self) -> &ActivityCalendar {
        &self.calendar
    }

    /// Earliest time any node has pending work.
    pub fn next_activity(&self) -> Option<SimTime> {
        self.calendar.earliest()
    }

    /// Check if no node has pending work.
    pub fn is_idle(&self) -> bool {
        self.calendar.is_empty()
    }

    /// Copy of every non-empty mailbox, in node id order.
    pub fn pending_snapshot(&self) -> BTreeMap<NodeId, BTreeMap<SimTime, Vec<E>>> {
        self.nodes
            .iter()
            .filter(|(_, record)| !record.mailbox.is_empty())
            .map(|(id, record)| (id.clone(), record.mailbox.clone()))
            .collect()
    }
}

impl<E: Clone> Default for PropagationGraph<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for PropagationGraph<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationGraph")
            .field("clock", &self.clock)
            .field("nodes", &self.nodes.len())
            .field("calendar", &self.calendar)
            .field("deferred", &self.deferred)
            .finish()
    }
}

/// Identity of the logic object itself, ignoring vtable differences.
fn same_logic<E>(a: &SharedLogic<E>, b: &SharedLogic<E>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}
