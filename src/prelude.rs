//! Prelude module for convenient imports
//!
//! Re-exports the types needed to describe, translate and execute a protocol.
//!
//! # Example
//!
//! ```rust,no_run
//! use protograph::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let graph = ProtocolGraph::from_file("path/to/protocol.bin")?;
//! let mut recorder = CommandRecorder::with_measurements([0.5, 0.8]);
//! let summary = ExecutionEngine::new(&graph).run(&mut recorder)?;
//!
//! println!("{}", TimelineFormatter::format(recorder.commands()));
//! println!("{} ticks, {}", summary.ticks, summary.elapsed);
//! # Ok(())
//! # }
//! ```

// Description and translation
pub use crate::compiler::{Translator, TranslatorBuilder, TranslatorConfig};
pub use crate::protocol::{
    Block, Clause, ContainerDeclaration, Duration, IntoProtocol, MixKind, Primitive,
    ProtocolBuilder, ProtocolDescription, Start, Statement, ThermalStep, Window,
};

// Graph and execution
pub use crate::backend::{ActuatorBackend, CommandRecorder};
pub use crate::catalog::{Command, Operation};
pub use crate::graph::visualizer::{DotGraph, GraphListing};
pub use crate::graph::{GraphBuilder, NodeId, Predicate, ProtocolGraph};
pub use crate::interpreter::{BranchPolicy, ExecutionEngine, ExecutionOptions, ExecutionSummary};

// Expressions and units
pub use crate::ast::{Expression, Value, ValueType};
pub use crate::evaluator::VariableStore;
pub use crate::units::{
    FieldStrength, FlowRate, FlowUnit, Frequency, FrequencyUnit, Temperature, TemperatureUnit,
    Time, Volume, VolumeUnit, Wavelength, WavelengthUnit,
};

// Error types
pub use crate::error::{
    ActuatorError, ArtifactError, ConversionError, EvaluationError, ExecutionError, GraphError,
    TranslationError, UnitError,
};

// Trace formatting
pub use crate::trace::TimelineFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
