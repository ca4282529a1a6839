//! Ready-made node logic: closures, relays, sinks, and recorders.

use std::cell::RefCell;

use tempo_model::NodeId;

use super::NodeLogic;

/// Node logic backed by a closure.
pub struct FnLogic<F> {
    id: NodeId,
    func: F,
}

impl<F> FnLogic<F> {
    /// Create closure-backed logic with the given identity.
    pub fn new(id: impl Into<NodeId>, func: F) -> Self {
        Self {
            id: id.into(),
            func,
        }
    }
}

impl<E, F> NodeLogic<E> for FnLogic<F>
where
    F: Fn(Vec<E>) -> Vec<E>,
{
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn process(&self, events: Vec<E>) -> Vec<E> {
        (self.func)(events)
    }
}

impl<F> std::fmt::Debug for FnLogic<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnLogic").field("id", &self.id).finish()
    }
}

/// Forwards every event it receives, unchanged.
#[derive(Debug, Clone)]
pub struct Relay {
    id: NodeId,
}

impl Relay {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self { id: id.into() }
    }
}

impl<E> NodeLogic<E> for Relay {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn process(&self, events: Vec<E>) -> Vec<E> {
        events
    }
}

/// Swallows everything; the end of a chain.
#[derive(Debug, Clone)]
pub struct Sink {
    id: NodeId,
}

impl Sink {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self { id: id.into() }
    }
}

impl<E> NodeLogic<E> for Sink {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn process(&self, _events: Vec<E>) -> Vec<E> {
        Vec::new()
    }
}

/// A relay that keeps a copy of every batch it is handed.
///
/// Optionally it can stop forwarding (`silent`) and only record.
#[derive(Debug)]
pub struct Recorder<E> {
    id: NodeId,
    forward: bool,
    batches: RefCell<Vec<Vec<E>>>,
}

impl<E> Recorder<E> {
    /// A recorder that forwards what it receives.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            forward: true,
            batches: RefCell::new(Vec::new()),
        }
    }

    /// A recorder that records but emits nothing.
    pub fn silent(id: impl Into<NodeId>) -> Self {
        Self {
            forward: false,
            ..Self::new(id)
        }
    }

    /// Number of batches processed so far.
    pub fn batch_count(&self) -> usize {
        self.batches.borrow().len()
    }
}

impl<E: Clone> Recorder<E> {
    /// Every batch received, in processing order.
    pub fn batches(&self) -> Vec<Vec<E>> {
        self.batches.borrow().clone()
    }

    /// Every event received, flattened in processing order.
    pub fn received(&self) -> Vec<E> {
        self.batches.borrow().iter().flatten().cloned().collect()
    }
}

impl<E: Clone> NodeLogic<E> for Recorder<E> {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn process(&self, events: Vec<E>) -> Vec<E> {
        self.batches.borrow_mut().push(events.clone());
        if self.forward {
            events
        } else {
            Vec::new()
        }
    }
}
