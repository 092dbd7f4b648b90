use crate::ast::{Value, ValueType};
use crate::graph::NodeId;
use thiserror::Error;

/// Errors raised while parsing unit-suffixed literals and timing windows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Quantity '{0}' does not start with a number")]
    MissingMagnitude(String),

    #[error("Unknown {dimension} unit '{unit}' in '{literal}'")]
    UnknownUnit {
        dimension: &'static str,
        unit: String,
        literal: String,
    },

    #[error("Malformed timing window '{0}', expected '[start:duration]'")]
    MalformedWindow(String),
}

/// Errors that can occur while evaluating an expression against the variable store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("Division by zero in '{0}'")]
    DivisionByZero(String),

    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: ValueType,
        found: Value,
    },
}

/// Violations of the protocol graph's structural rules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("The protocol graph has no nodes")]
    Empty,

    #[error("Edge from node {source_node} points to node {target}, which does not exist")]
    DanglingEdge { source_node: NodeId, target: NodeId },

    #[error("Node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("Expected exactly one node without incoming edges, found {0:?}")]
    StartNode(Vec<NodeId>),
}

/// Errors that can occur while translating a protocol description into a graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    #[error("Container '{0}' is not declared")]
    UndefinedContainer(String),

    #[error("Variable '{variable}' is used by {context} before it is defined")]
    UndefinedVariable { variable: String, context: String },

    #[error("Operation '{0}' has no duration and no enclosing block provides one")]
    UnresolvedDuration(String),

    #[error("Malformed expression '{expression}': {reason}")]
    MalformedExpression { expression: String, reason: String },

    #[error("{context} must be a constant, but '{expression}' cannot be resolved before execution")]
    NonConstant { context: String, expression: String },

    #[error("The tick interval must be a positive duration, got {0}ms")]
    InvalidTickInterval(f64),

    #[error("The {context} of {millis}ms does not fit on the tick grid")]
    UnschedulableSpan { context: String, millis: f64 },

    #[error("Invalid protocol structure: {0}")]
    Structural(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors reported by an actuator backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("No scripted measurement left for '{0}'")]
    MeasurementsExhausted(String),

    #[error("Actuator failure: {0}")]
    Backend(String),
}

/// A failed attempt to run a single operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

/// Terminal failures of a protocol run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Evaluation failed at node {node}: {source}")]
    Evaluation {
        node: NodeId,
        #[source]
        source: EvaluationError,
    },

    #[error("Actuator call failed at node {node}: {source}")]
    Actuator {
        node: NodeId,
        #[source]
        source: ActuatorError,
    },

    #[error("Node {node} enabled {count} conditional branches at once")]
    AmbiguousBranch { node: NodeId, count: usize },

    #[error("Execution stopped after {0} steps")]
    StepLimitExceeded(u64),
}

/// Errors raised while saving or loading compiled protocol graphs.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Encode(String),

    #[error("Deserialization failed: {0}")]
    Decode(String),
}

/// Errors that can occur when converting a custom user format into a `ProtocolDescription`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Invalid custom data: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Unit(#[from] UnitError),
}
