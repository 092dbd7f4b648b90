//! The protocol graph: an arena of operation nodes connected by guarded edges.

mod artifact;
pub mod visualizer;

use crate::ast::Expression;
use crate::catalog::{Operation, OperationKind};
use crate::error::{EvaluationError, GraphError};
use crate::evaluator::VariableStore;
use crate::units::Time;
use serde::{Deserialize, Serialize};

/// Stable index of a node inside its graph.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: OperationKind,
    pub operation: Operation,
}

/// The condition under which an edge lets execution continue to its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Always,
    When(Expression),
}

impl Predicate {
    pub fn holds(&self, store: &VariableStore) -> Result<bool, EvaluationError> {
        match self {
            Predicate::Always => Ok(true),
            Predicate::When(condition) => store.evaluate_bool(condition),
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Predicate::When(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub target: NodeId,
    pub condition: Predicate,
}

/// A translated protocol. Read-only once built; cycles are legitimate (loops).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolGraph {
    nodes: Vec<Node>,
    edges: Vec<Vec<Edge>>,
    start: NodeId,
    tick: Time,
}

impl ProtocolGraph {
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// The interval one `Tick` node represents.
    pub fn tick_interval(&self) -> Time {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn operation(&self, id: NodeId) -> Result<&Operation, GraphError> {
        self.node(id).map(|n| &n.operation)
    }

    pub fn is_cpu_operation(&self, id: NodeId) -> Result<bool, GraphError> {
        self.node(id).map(|n| n.kind == OperationKind::Cpu)
    }

    pub fn is_actuator_operation(&self, id: NodeId) -> Result<bool, GraphError> {
        self.node(id).map(|n| n.kind == OperationKind::Actuator)
    }

    /// Outgoing edges of `id`, in insertion order.
    pub fn outgoing_edges(&self, id: NodeId) -> Result<&[Edge], GraphError> {
        self.edges
            .get(id)
            .map(Vec::as_slice)
            .ok_or(GraphError::UnknownNode(id))
    }
}

/// Incremental construction of a `ProtocolGraph`.
///
/// Nodes receive consecutive ids. `build` checks that every edge connects existing nodes
/// and that exactly one node has no incoming edges, which becomes the start node.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Vec<Edge>>,
    /// Sources of edges added before (or without) their source node.
    unknown_sources: Vec<NodeId>,
    tick: Time,
}

impl GraphBuilder {
    pub fn new(tick: Time) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            unknown_sources: Vec::new(),
            tick,
        }
    }

    pub fn add_node(&mut self, operation: Operation) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            kind: operation.kind(),
            operation,
        });
        self.edges.push(Vec::new());
        id
    }

    /// Adds an edge. Targets are validated by `build`, so an edge may point at a node
    /// added later. The source must already exist; `build` reports it otherwise.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, condition: Predicate) -> &mut Self {
        match self.edges.get_mut(from) {
            Some(out) => out.push(Edge {
                target: to,
                condition,
            }),
            None => self.unknown_sources.push(from),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn build(self) -> Result<ProtocolGraph, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }
        if let Some(&source) = self.unknown_sources.first() {
            return Err(GraphError::UnknownNode(source));
        }
        let mut has_incoming = vec![false; self.nodes.len()];
        for (source, out) in self.edges.iter().enumerate() {
            for edge in out {
                match has_incoming.get_mut(edge.target) {
                    Some(flag) => *flag = true,
                    None => {
                        return Err(GraphError::DanglingEdge {
                            source_node: source,
                            target: edge.target,
                        });
                    }
                }
            }
        }
        let roots: Vec<NodeId> = has_incoming
            .iter()
            .enumerate()
            .filter(|(_, incoming)| !**incoming)
            .map(|(id, _)| id)
            .collect();
        if roots.len() != 1 {
            return Err(GraphError::StartNode(roots));
        }
        Ok(ProtocolGraph {
            start: roots[0],
            nodes: self.nodes,
            edges: self.edges,
            tick: self.tick,
        })
    }
}
