//! Execution of protocol graphs against an actuator backend.

use crate::backend::ActuatorBackend;
use crate::error::{ExecutionError, OperationError};
use crate::evaluator::VariableStore;
use crate::graph::{NodeId, ProtocolGraph};
use crate::units::Time;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

/// What to do when a node enables more than one conditional edge in the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BranchPolicy {
    /// Follow every enabled edge and log a warning.
    #[default]
    Report,
    /// Abort the run with [`ExecutionError::AmbiguousBranch`].
    Reject,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    pub branch_policy: BranchPolicy,
    /// Upper bound on executed nodes, for protocols whose loops may never end.
    pub max_steps: Option<u64>,
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionSummary {
    pub nodes_executed: u64,
    pub ticks: u64,
    /// Simulated time, one tick interval per executed tick.
    pub elapsed: Time,
}

/// Runs a [`ProtocolGraph`] from its start node until no work is left.
///
/// Pending nodes live on a last-in-first-out worklist. A node is only pushed when it is
/// not pending already, so joins of parallel chains execute once per visit of the join.
/// Every run starts from an empty variable store.
pub struct ExecutionEngine<'g> {
    graph: &'g ProtocolGraph,
    options: ExecutionOptions,
}

impl<'g> ExecutionEngine<'g> {
    pub fn new(graph: &'g ProtocolGraph) -> Self {
        Self {
            graph,
            options: ExecutionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub fn run(
        &self,
        backend: &mut dyn ActuatorBackend,
    ) -> Result<ExecutionSummary, ExecutionError> {
        let span = info_span!("execute", nodes = self.graph.len());
        let _guard = span.enter();

        let mut store = VariableStore::new();
        let mut worklist: Vec<NodeId> = vec![self.graph.start()];
        let mut nodes_executed: u64 = 0;
        let mut ticks: u64 = 0;

        while let Some(id) = worklist.pop() {
            if let Some(limit) = self.options.max_steps {
                if nodes_executed >= limit {
                    warn!(limit, "step limit reached");
                    return Err(ExecutionError::StepLimitExceeded(limit));
                }
            }
            let node = self.graph.node(id)?;
            debug!(node = id, operation = %node.operation, "executing");
            node.operation
                .execute(&mut store, backend)
                .map_err(|error| match error {
                    OperationError::Evaluation(source) => {
                        ExecutionError::Evaluation { node: id, source }
                    }
                    OperationError::Actuator(source) => {
                        ExecutionError::Actuator { node: id, source }
                    }
                })?;
            nodes_executed += 1;
            if node.operation.is_tick() {
                ticks += 1;
            }

            let mut fired_conditionals = 0;
            for edge in self.graph.outgoing_edges(id)? {
                let enabled = edge
                    .condition
                    .holds(&store)
                    .map_err(|source| ExecutionError::Evaluation { node: id, source })?;
                if !enabled {
                    continue;
                }
                if edge.condition.is_conditional() {
                    fired_conditionals += 1;
                }
                if !worklist.contains(&edge.target) {
                    worklist.push(edge.target);
                }
            }

            if fired_conditionals > 1 {
                match self.options.branch_policy {
                    BranchPolicy::Report => warn!(
                        node = id,
                        count = fired_conditionals,
                        "several conditional edges enabled at once"
                    ),
                    BranchPolicy::Reject => {
                        return Err(ExecutionError::AmbiguousBranch {
                            node: id,
                            count: fired_conditionals,
                        });
                    }
                }
            }
        }

        let summary = ExecutionSummary {
            nodes_executed,
            ticks,
            elapsed: self.graph.tick_interval().times(ticks),
        };
        info!(
            nodes = summary.nodes_executed,
            ticks = summary.ticks,
            elapsed = %summary.elapsed,
            "protocol finished"
        );
        Ok(summary)
    }
}
