use super::{Predicate, ProtocolGraph};
use crate::catalog::OperationKind;
use itertools::Itertools;
use std::fmt;

/// A wrapper to display a graph as a numbered listing, one node per line.
///
/// ```text
/// 0000 [act] setTimeStep(1000ms)            -> 0001
/// 0004 [cpu] branch                         -> 0005 if flag > 0, 0009 if not flag > 0
/// ```
pub struct GraphListing<'a>(pub &'a ProtocolGraph);

impl fmt::Display for GraphListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.0;
        writeln!(
            f,
            "======== PROTOCOL GRAPH: {} nodes, {} edges, tick {} ========",
            graph.len(),
            graph.edge_count(),
            graph.tick_interval()
        )?;
        for node in graph.nodes() {
            let kind = match node.kind {
                OperationKind::Cpu => "cpu",
                OperationKind::Actuator => "act",
            };
            let marker = if node.id == graph.start() { '*' } else { ' ' };
            let targets = graph
                .outgoing_edges(node.id)
                .map_err(|_| fmt::Error)?
                .iter()
                .map(|edge| match &edge.condition {
                    Predicate::Always => format!("{:04}", edge.target),
                    Predicate::When(condition) => format!("{:04} if {}", edge.target, condition),
                })
                .join(", ");
            writeln!(
                f,
                "{}{:04} [{}] {:<40} -> {}",
                marker,
                node.id,
                kind,
                node.operation.to_string(),
                if targets.is_empty() { "end" } else { &targets }
            )?;
        }
        Ok(())
    }
}

/// A wrapper to display a graph in Graphviz DOT format.
pub struct DotGraph<'a>(pub &'a ProtocolGraph);

impl fmt::Display for DotGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.0;
        writeln!(f, "digraph protocol {{")?;
        writeln!(f, "    node [fontname=\"monospace\"];")?;
        for node in graph.nodes() {
            let shape = match node.kind {
                OperationKind::Cpu => "diamond",
                OperationKind::Actuator if node.operation.is_tick() => "point",
                OperationKind::Actuator => "box",
            };
            writeln!(
                f,
                "    n{} [label=\"{}\", shape={}];",
                node.id,
                escape(&node.operation.to_string()),
                shape
            )?;
        }
        for node in graph.nodes() {
            for edge in graph.outgoing_edges(node.id).map_err(|_| fmt::Error)? {
                match &edge.condition {
                    Predicate::Always => writeln!(f, "    n{} -> n{};", node.id, edge.target)?,
                    Predicate::When(condition) => writeln!(
                        f,
                        "    n{} -> n{} [label=\"{}\"];",
                        node.id,
                        edge.target,
                        escape(&condition.to_string())
                    )?,
                }
            }
        }
        writeln!(f, "}}")
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
