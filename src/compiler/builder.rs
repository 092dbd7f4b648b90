use crate::catalog::Operation;
use crate::error::GraphError;
use crate::graph::{GraphBuilder, NodeId, Predicate, ProtocolGraph};
use crate::units::Time;

/// A not yet connected way out of the graph built so far.
#[derive(Debug, Clone)]
pub(super) struct Exit {
    pub(super) from: NodeId,
    pub(super) condition: Predicate,
}

/// Every exit that must be connected to whatever is emitted next.
pub(super) type Frontier = Vec<Exit>;

pub(super) fn always(from: NodeId) -> Frontier {
    vec![Exit {
        from,
        condition: Predicate::Always,
    }]
}

pub(super) fn when(from: NodeId, condition: Predicate) -> Frontier {
    vec![Exit { from, condition }]
}

/// Emits nodes into a `GraphBuilder`, threading a frontier of open exits.
pub(super) struct GraphEmitter {
    graph: GraphBuilder,
}

impl GraphEmitter {
    pub(super) fn new(tick: Time) -> Self {
        Self {
            graph: GraphBuilder::new(tick),
        }
    }

    pub(super) fn node(&mut self, operation: Operation) -> NodeId {
        self.graph.add_node(operation)
    }

    /// Connects every exit of `frontier` to `to`.
    pub(super) fn attach(&mut self, frontier: Frontier, to: NodeId) {
        for exit in frontier {
            self.graph.add_edge(exit.from, to, exit.condition);
        }
    }

    /// Appends `operations` one after another.
    pub(super) fn chain(
        &mut self,
        mut frontier: Frontier,
        operations: impl IntoIterator<Item = Operation>,
    ) -> Frontier {
        for operation in operations {
            let id = self.node(operation);
            self.attach(frontier, id);
            frontier = always(id);
        }
        frontier
    }

    pub(super) fn ticks(&mut self, frontier: Frontier, count: usize) -> Frontier {
        self.chain(frontier, std::iter::repeat_n(Operation::Tick, count))
    }

    /// Emits a scheduled segment as a clock spine with one side chain per busy slot.
    ///
    /// Spine tick `s-1` links first to spine tick `s` and then to the head of slot `s`'s
    /// command chain, whose tail rejoins spine tick `s`. Executed last-in-first-out with
    /// duplicate suppression, every slot's commands run before the tick that ends it.
    /// With `closing` the segment also ends with a tick after its final slot.
    pub(super) fn segment(
        &mut self,
        mut frontier: Frontier,
        slots: Vec<Vec<Operation>>,
        closing: bool,
    ) -> Frontier {
        let last = slots.len().saturating_sub(1);
        let mut spine: Option<NodeId> = None;
        for (slot, commands) in slots.into_iter().enumerate() {
            let ends_with_tick = slot < last || closing;
            match spine {
                None => {
                    frontier = self.chain(frontier, commands);
                    if ends_with_tick {
                        let tick = self.node(Operation::Tick);
                        self.attach(frontier, tick);
                        spine = Some(tick);
                        frontier = always(tick);
                    }
                }
                Some(previous) if ends_with_tick => {
                    let tick = self.node(Operation::Tick);
                    self.graph.add_edge(previous, tick, Predicate::Always);
                    if !commands.is_empty() {
                        let tail = self.chain(always(previous), commands);
                        self.attach(tail, tick);
                    }
                    spine = Some(tick);
                    frontier = always(tick);
                }
                Some(previous) => {
                    frontier = self.chain(always(previous), commands);
                }
            }
        }
        frontier
    }

    pub(super) fn finish(self) -> Result<ProtocolGraph, GraphError> {
        self.graph.build()
    }
}
