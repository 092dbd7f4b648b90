use clap::{Parser, ValueEnum};
use protograph::prelude::*;
use protograph::units::{Amount, Unit};
use serde::Deserialize;
use std::fs;
use std::result::Result;
use std::time::Instant;
use tracing::info;

// --- JSON Deserialization Structs (Input Format Specific) ---
// These structs match the `protocol.json` format and are only used here for conversion.

#[derive(Deserialize)]
struct RawProtocol {
    #[serde(default)]
    containers: Vec<RawContainer>,
    #[serde(default)]
    body: Vec<RawStatement>,
}

#[derive(Deserialize)]
struct RawContainer {
    name: String,
    volume: RawAmount,
}

/// An expression: a number, a boolean, a variable name or an operator applied to operands.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawExpr {
    Number(f64),
    Bool(bool),
    Variable(String),
    Operation { op: String, args: Vec<RawExpr> },
}

/// A quantity: either a literal such as `"10ml/h"` or an expression with a unit.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Literal(String),
    Expression { value: RawExpr, unit: String },
}

#[derive(Deserialize)]
struct RawClause {
    condition: RawExpr,
    body: Vec<RawStatement>,
}

#[derive(Deserialize)]
struct RawStep {
    temperature: RawAmount,
    duration: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RawStatement {
    Assign {
        variable: String,
        value: RawExpr,
    },
    ContinuousFlow {
        window: Option<String>,
        path: Vec<String>,
        rate: RawAmount,
    },
    Transfer {
        window: Option<String>,
        source: String,
        target: String,
        volume: RawAmount,
    },
    Incubate {
        window: Option<String>,
        container: String,
        temperature: RawAmount,
        shaking: Option<RawAmount>,
    },
    Centrifugation {
        window: Option<String>,
        container: String,
        speed: RawAmount,
        temperature: Option<RawAmount>,
    },
    Stir {
        window: Option<String>,
        container: String,
        frequency: RawAmount,
    },
    Shake {
        window: Option<String>,
        container: String,
        frequency: RawAmount,
    },
    Electrophoresis {
        window: Option<String>,
        container: String,
        field: RawAmount,
    },
    #[serde(rename = "measureOD", alias = "measureOd")]
    MeasureOd {
        window: Option<String>,
        container: String,
        frequency: RawAmount,
        wavelength: RawAmount,
        bind: Option<String>,
    },
    MeasureFluorescence {
        window: Option<String>,
        container: String,
        frequency: RawAmount,
        excitation: RawAmount,
        emission: RawAmount,
        bind: Option<String>,
    },
    If {
        window: Option<String>,
        clauses: Vec<RawClause>,
        #[serde(rename = "else")]
        otherwise: Option<Vec<RawStatement>>,
    },
    While {
        window: Option<String>,
        condition: RawExpr,
        body: Vec<RawStatement>,
    },
    Thermocycling {
        window: Option<String>,
        container: String,
        cycles: RawExpr,
        steps: Vec<RawStep>,
    },
}

/// Define a CLI-specific enum for clap to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// The raw `;`-terminated command stream
    Stream,
    /// One timestamped command per line
    Timeline,
    /// The numbered graph listing
    Graph,
    /// Graphviz DOT
    Dot,
    /// The graph as JSON
    Json,
}

// --- Converter Implementation ---
// This implements the conversion from the raw JSON model to the canonical ProtocolDescription.

impl IntoProtocol for RawProtocol {
    fn into_protocol(self) -> Result<ProtocolDescription, ConversionError> {
        let containers = self
            .containers
            .into_iter()
            .map(|raw| -> Result<ContainerDeclaration, ConversionError> {
                Ok(ContainerDeclaration {
                    name: raw.name,
                    volume: amount(raw.volume)?,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(ProtocolDescription {
            containers,
            body: block(self.body)?,
        })
    }
}

fn block(raw: Vec<RawStatement>) -> Result<Block, ConversionError> {
    raw.into_iter().map(statement).collect()
}

fn window(raw: Option<String>) -> Result<Window, ConversionError> {
    match raw {
        Some(text) => Ok(text.parse()?),
        None => Ok(Window::unspecified()),
    }
}

fn operation(
    window_text: Option<String>,
    primitive: Primitive,
) -> Result<Statement, ConversionError> {
    Ok(Statement::Operation {
        primitive,
        window: window(window_text)?,
    })
}

fn statement(raw: RawStatement) -> Result<Statement, ConversionError> {
    match raw {
        RawStatement::Assign { variable, value } => Ok(Statement::Assign {
            variable,
            value: expression(value)?,
        }),
        RawStatement::ContinuousFlow { window, path, rate } => operation(
            window,
            Primitive::ContinuousFlow {
                path,
                rate: amount(rate)?,
            },
        ),
        RawStatement::Transfer {
            window,
            source,
            target,
            volume,
        } => operation(
            window,
            Primitive::Transfer {
                source,
                target,
                volume: amount(volume)?,
            },
        ),
        RawStatement::Incubate {
            window,
            container,
            temperature,
            shaking,
        } => operation(
            window,
            Primitive::Incubate {
                container,
                temperature: amount(temperature)?,
                shaking: shaking.map(amount).transpose()?,
            },
        ),
        RawStatement::Centrifugation {
            window,
            container,
            speed,
            temperature,
        } => operation(
            window,
            Primitive::Centrifugation {
                container,
                speed: amount(speed)?,
                temperature: temperature.map(amount).transpose()?,
            },
        ),
        RawStatement::Stir {
            window,
            container,
            frequency,
        } => operation(
            window,
            Primitive::Mix {
                container,
                kind: MixKind::Stir,
                frequency: amount(frequency)?,
            },
        ),
        RawStatement::Shake {
            window,
            container,
            frequency,
        } => operation(
            window,
            Primitive::Mix {
                container,
                kind: MixKind::Shake,
                frequency: amount(frequency)?,
            },
        ),
        RawStatement::Electrophoresis {
            window,
            container,
            field,
        } => operation(
            window,
            Primitive::Electrophoresis {
                container,
                field: amount(field)?,
            },
        ),
        RawStatement::MeasureOd {
            window,
            container,
            frequency,
            wavelength,
            bind,
        } => operation(
            window,
            Primitive::MeasureOd {
                container,
                frequency: amount(frequency)?,
                wavelength: amount(wavelength)?,
                bind,
            },
        ),
        RawStatement::MeasureFluorescence {
            window,
            container,
            frequency,
            excitation,
            emission,
            bind,
        } => operation(
            window,
            Primitive::MeasureFluorescence {
                container,
                frequency: amount(frequency)?,
                excitation: amount(excitation)?,
                emission: amount(emission)?,
                bind,
            },
        ),
        RawStatement::If {
            window: window_text,
            clauses,
            otherwise,
        } => Ok(Statement::If {
            window: window(window_text)?,
            clauses: clauses
                .into_iter()
                .map(|clause| -> Result<Clause, ConversionError> {
                    Ok(Clause {
                        condition: expression(clause.condition)?,
                        body: block(clause.body)?,
                    })
                })
                .collect::<Result<_, _>>()?,
            otherwise: otherwise.map(block).transpose()?,
        }),
        RawStatement::While {
            window: window_text,
            condition,
            body,
        } => Ok(Statement::While {
            window: window(window_text)?,
            condition: expression(condition)?,
            body: block(body)?,
        }),
        RawStatement::Thermocycling {
            window: window_text,
            container,
            cycles,
            steps,
        } => Ok(Statement::Thermocycling {
            window: window(window_text)?,
            container,
            cycles: expression(cycles)?,
            steps: steps
                .into_iter()
                .map(|step| -> Result<ThermalStep, ConversionError> {
                    Ok(ThermalStep {
                        temperature: amount(step.temperature)?,
                        duration: step.duration.parse()?,
                    })
                })
                .collect::<Result<_, _>>()?,
        }),
    }
}

fn amount<U: Unit>(raw: RawAmount) -> Result<Amount<U>, ConversionError> {
    match raw {
        RawAmount::Literal(text) => Ok(text.parse()?),
        RawAmount::Expression { value, unit } => {
            let parsed = U::from_symbol(&unit).ok_or_else(|| UnitError::UnknownUnit {
                dimension: U::DIMENSION,
                unit: unit.clone(),
                literal: unit.clone(),
            })?;
            Ok(Amount::of(expression(value)?, parsed))
        }
    }
}

fn expression(raw: RawExpr) -> Result<Expression, ConversionError> {
    let (op, args) = match raw {
        RawExpr::Number(n) => return Ok(Expression::number(n)),
        RawExpr::Bool(b) => return Ok(Expression::boolean(b)),
        RawExpr::Variable(name) => return Ok(Expression::variable(name)),
        RawExpr::Operation { op, args } => (op, args),
    };
    let mut operands = args
        .into_iter()
        .map(expression)
        .collect::<Result<Vec<_>, _>>()?;
    if op == "not" {
        return match (operands.pop(), operands.is_empty()) {
            (Some(value), true) => Ok(value.not()),
            _ => Err(ConversionError::ValidationError(
                "'not' takes exactly one operand".to_string(),
            )),
        };
    }
    let (Some(rhs), Some(lhs), true) = (operands.pop(), operands.pop(), operands.is_empty()) else {
        return Err(ConversionError::ValidationError(format!(
            "'{}' takes exactly two operands",
            op
        )));
    };
    let combined = match op.as_str() {
        "+" => lhs.plus(rhs),
        "-" => lhs.minus(rhs),
        "*" => lhs.times(rhs),
        "/" => lhs.divided_by(rhs),
        "and" => lhs.and(rhs),
        "or" => lhs.or(rhs),
        "==" => lhs.equals(rhs),
        "!=" => lhs.not_equals(rhs),
        ">" => lhs.greater_than(rhs),
        ">=" => lhs.greater_or_equal(rhs),
        "<" => lhs.less_than(rhs),
        "<=" => lhs.less_or_equal(rhs),
        other => {
            return Err(ConversionError::ValidationError(format!(
                "unknown operator '{}'",
                other
            )));
        }
    };
    Ok(combined)
}

/// Translates a lab protocol description into an operation graph and simulates it
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the protocol description JSON file
    description_path: Option<String>,

    /// Run a previously saved graph artifact instead of translating a description
    #[arg(long)]
    load: Option<String>,

    /// Save the translated graph as a binary artifact
    #[arg(long)]
    save: Option<String>,

    /// Simulated time per tick, e.g. `1s` or `200ms`
    #[arg(short, long, default_value = "1s")]
    tick: String,

    /// Ticks appended after the protocol body
    #[arg(long)]
    settle_ticks: Option<u32>,

    /// Scripted measurement readings, in retrieval order
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    measurements: Vec<f64>,

    /// What to print
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Stream)]
    format: OutputFormat,

    /// Abort after this many executed nodes
    #[arg(long)]
    max_steps: Option<u64>,

    /// Fail when a node enables more than one conditional branch
    #[arg(long)]
    reject_ambiguous: bool,

    /// Log translation and execution progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let start = Instant::now();
    let graph = match (&cli.load, &cli.description_path) {
        (Some(path), _) => ProtocolGraph::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load graph: {}", e))),
        (None, Some(path)) => translate_file(path, &cli),
        (None, None) => exit_with_error("Either a description path or --load is required."),
    };
    info!(elapsed = ?start.elapsed(), nodes = graph.len(), "graph ready");

    if let Some(path) = &cli.save {
        graph
            .save(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to save graph: {}", e)));
        info!(path = %path, "graph saved");
    }

    match cli.format {
        OutputFormat::Graph => print!("{}", GraphListing(&graph)),
        OutputFormat::Dot => print!("{}", DotGraph(&graph)),
        OutputFormat::Json => println!(
            "{}",
            graph
                .to_json()
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to export graph: {}", e)))
        ),
        OutputFormat::Stream | OutputFormat::Timeline => {
            let options = ExecutionOptions {
                branch_policy: if cli.reject_ambiguous {
                    BranchPolicy::Reject
                } else {
                    BranchPolicy::Report
                },
                max_steps: cli.max_steps,
            };
            let mut recorder = CommandRecorder::with_measurements(cli.measurements.iter().copied());
            let summary = ExecutionEngine::new(&graph)
                .with_options(options)
                .run(&mut recorder)
                .unwrap_or_else(|e| exit_with_error(&format!("Execution failed: {}", e)));
            if cli.format == OutputFormat::Stream {
                println!("{}", recorder.stream());
            } else {
                println!("{}", TimelineFormatter::format(recorder.commands()));
            }
            eprintln!(
                "{} nodes executed, {} ticks, {} simulated, {} measurements unused",
                summary.nodes_executed,
                summary.ticks,
                summary.elapsed,
                recorder.remaining_measurements()
            );
        }
    }
}

fn translate_file(path: &str, cli: &Cli) -> ProtocolGraph {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", path, e)));
    let raw: RawProtocol = serde_json::from_str(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse protocol JSON: {}", e)));
    let description = raw
        .into_protocol()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to convert protocol: {}", e)));
    let tick: Time = cli
        .tick
        .parse()
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid tick interval: {}", e)));

    let mut builder = Translator::builder(description).tick_interval(tick);
    if let Some(ticks) = cli.settle_ticks {
        builder = builder.settle_ticks(ticks);
    }
    builder
        .build()
        .translate()
        .unwrap_or_else(|e| exit_with_error(&format!("Translation failed: {}", e)))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
