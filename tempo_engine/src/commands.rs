//! Deferred commands - graph mutations requested while a step is running.
//!
//! Node logic must not touch the graph during `process`. Instead it can hold
//! a [`DeferredCommands`] handle (from `PropagationGraph::deferred`) and queue
//! edge registrations or injections on it. The graph applies the queue, in
//! submission order, once the current step's wavefront has drained and the
//! clock has advanced.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tempo_model::{NodeId, SimDuration, SimTime};

use crate::node::SharedLogic;

/// A queued graph mutation.
pub enum Command<E> {
    /// Register or update the edge `source -> destination`.
    Connect {
        source: SharedLogic<E>,
        destination: SharedLogic<E>,
        latency: SimDuration,
    },

    /// Deliver `event` to `target` at `at`.
    Inject { target: NodeId, at: SimTime, event: E },
}

impl<E> std::fmt::Debug for Command<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Connect {
                source,
                destination,
                latency,
            } => f
                .debug_struct("Connect")
                .field("source", source.id())
                .field("destination", destination.id())
                .field("latency", latency)
                .finish(),
            Command::Inject { target, at, .. } => f
                .debug_struct("Inject")
                .field("target", target)
                .field("at", at)
                .finish_non_exhaustive(),
        }
    }
}

/// Shared handle onto a graph's deferred command queue.
///
/// Cloning the handle shares the same queue. The queue is single-threaded,
/// like the graph that owns it.
pub struct DeferredCommands<E> {
    queue: Rc<RefCell<VecDeque<Command<E>>>>,
}

impl<E> DeferredCommands<E> {
    pub(crate) fn new() -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    /// Queue an edge registration.
    pub fn connect(
        &self,
        source: &SharedLogic<E>,
        destination: &SharedLogic<E>,
        latency: SimDuration,
    ) {
        self.push(Command::Connect {
            source: Rc::clone(source),
            destination: Rc::clone(destination),
            latency,
        });
    }

    /// Queue an injection.
    pub fn inject(&self, target: impl Into<NodeId>, at: SimTime, event: E) {
        self.push(Command::Inject {
            target: target.into(),
            at,
            event,
        });
    }

    /// Number of commands waiting.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Check if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Take every waiting command, oldest first.
    pub(crate) fn drain(&self) -> Vec<Command<E>> {
        self.queue.borrow_mut().drain(..).collect()
    }

    fn push(&self, command: Command<E>) {
        self.queue.borrow_mut().push_back(command);
    }
}

impl<E> Clone for DeferredCommands<E> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<E> std::fmt::Debug for DeferredCommands<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredCommands")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{shared, Relay};

    #[test]
    fn test_clones_share_one_queue() {
        let commands: DeferredCommands<u8> = DeferredCommands::new();
        let handle = commands.clone();

        handle.inject("a", SimTime::ZERO, 1);
        assert_eq!(commands.len(), 1);
        assert!(!commands.is_empty());
    }

    #[test]
    fn test_drain_preserves_submission_order() {
        let commands: DeferredCommands<u8> = DeferredCommands::new();
        let a = shared(Relay::new("a"));
        let b = shared(Relay::new("b"));

        commands.inject("a", SimTime::from_millis(5), 7);
        commands.connect(&a, &b, SimDuration::from_millis(1));

        let drained = commands.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], Command::Inject { event: 7, .. }));
        assert!(matches!(drained[1], Command::Connect { .. }));
        assert!(commands.is_empty());
    }
}
