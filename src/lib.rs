//! # Protograph - Lab Protocol Translation and Simulation
//!
//! **Protograph** turns structured laboratory protocol descriptions (containers, timed
//! operations, variables, branches and loops) into a directed graph of primitive
//! operations, and executes that graph against a pluggable actuator backend on a
//! simulated tick clock.
//!
//! ## Core Workflow
//!
//! 1.  **Describe**: Build a `ProtocolDescription` with the `ProtocolBuilder`, or implement
//!     the `IntoProtocol` trait for your own protocol format.
//! 2.  **Translate**: Use `Translator::builder` to choose the tick interval and translate
//!     the description into a `ProtocolGraph`. Graphs can be saved and reloaded as binary
//!     artifacts.
//! 3.  **Execute**: Run the graph with an `ExecutionEngine` against any `ActuatorBackend`.
//!     The `CommandRecorder` backend records the textual command stream and answers
//!     measurements from a scripted sequence.
//!
//! ## Quick Start
//!
//! ```rust
//! use protograph::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let description = ProtocolBuilder::new()
//!         .container("A", "10ml".parse()?)
//!         .container("B", "0ml".parse()?)
//!         .operation(
//!             "[0s:2s]".parse()?,
//!             Primitive::ContinuousFlow {
//!                 path: vec!["A".into(), "B".into()],
//!                 rate: "300ml/h".parse()?,
//!             },
//!         )
//!         .build()?;
//!
//!     let graph = Translator::builder(description)
//!         .tick_interval(Time::from_secs(1.0))
//!         .build()
//!         .translate()?;
//!
//!     let mut recorder = CommandRecorder::new();
//!     let summary = ExecutionEngine::new(&graph).run(&mut recorder)?;
//!
//!     assert_eq!(summary.ticks, 4);
//!     assert_eq!(
//!         recorder.stream(),
//!         "setTimeStep(1000ms);loadContainer(A,10ml);loadContainer(B,0ml);\
//!          setContinuosFlow(A,B,300ml/h);timeStep();timeStep();stopContinuosFlow(A,B);\
//!          timeStep();timeStep();"
//!     );
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod backend;
pub mod catalog;
pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod interpreter;
pub mod prelude;
pub mod protocol;
pub mod trace;
pub mod units;
