//! The node logic capability.

use std::rc::Rc;

use tempo_model::NodeId;

/// A pure batch transformer identified by a stable id.
///
/// This is the engine's sole extension point: domain behavior (state
/// machines, derived facts, constraint propagation) is written as an
/// implementation of this trait and wired in with edges. Logic that keeps
/// state does so behind `&self` with interior mutability.
///
/// Implementations must not call back into the graph while processing;
/// use [`crate::DeferredCommands`] to request topology changes or
/// injections instead.
pub trait NodeLogic<E> {
    /// The identity used as the node's lookup key.
    fn id(&self) -> &NodeId;

    /// Consume one timestamp's batch and produce the batch to propagate.
    fn process(&self, events: Vec<E>) -> Vec<E>;
}

/// Node logic as held by the graph: shared with, and owned by, its creator.
pub type SharedLogic<E> = Rc<dyn NodeLogic<E>>;

/// Wrap a logic value for registration with a graph.
pub fn shared<E, L>(logic: L) -> SharedLogic<E>
where
    L: NodeLogic<E> + 'static,
{
    Rc::new(logic)
}
