use crate::ast::Expression;
use crate::error::UnitError;
use crate::units::{FieldStrength, FlowRate, Frequency, Temperature, Time, Volume, Wavelength};
use std::fmt;
use std::str::FromStr;

/// The complete, structured description of a protocol, ready for translation.
/// This is the target structure for any custom data model conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolDescription {
    pub containers: Vec<ContainerDeclaration>,
    pub body: Block,
}

/// A named vessel and the volume it is loaded with before the protocol starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerDeclaration {
    pub name: String,
    pub volume: Volume,
}

pub type Block = Vec<Statement>;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = expression`
    Assign { variable: String, value: Expression },
    /// A physical operation scheduled inside its timing window.
    Operation { primitive: Primitive, window: Window },
    /// `if / elif / else`. Clauses are listed in source order.
    If {
        window: Window,
        clauses: Vec<Clause>,
        otherwise: Option<Block>,
    },
    While {
        window: Window,
        condition: Expression,
        body: Block,
    },
    /// Repeats the temperature `steps` on `container` `cycles` times.
    Thermocycling {
        window: Window,
        container: String,
        cycles: Expression,
        steps: Vec<ThermalStep>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub condition: Expression,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThermalStep {
    pub temperature: Temperature,
    pub duration: Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixKind {
    Stir,
    Shake,
}

/// The physical operations a protocol can schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Pumps continuously along `path`, one flow per consecutive pair of containers.
    ContinuousFlow { path: Vec<String>, rate: FlowRate },
    Transfer {
        source: String,
        target: String,
        volume: Volume,
    },
    Incubate {
        container: String,
        temperature: Temperature,
        shaking: Option<Frequency>,
    },
    Centrifugation {
        container: String,
        speed: Frequency,
        temperature: Option<Temperature>,
    },
    Mix {
        container: String,
        kind: MixKind,
        frequency: Frequency,
    },
    Electrophoresis {
        container: String,
        field: FieldStrength,
    },
    MeasureOd {
        container: String,
        frequency: Frequency,
        wavelength: Wavelength,
        bind: Option<String>,
    },
    MeasureFluorescence {
        container: String,
        frequency: Frequency,
        excitation: Wavelength,
        emission: Wavelength,
        bind: Option<String>,
    },
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::ContinuousFlow { .. } => "continuousFlow",
            Primitive::Transfer { .. } => "transfer",
            Primitive::Incubate { .. } => "incubate",
            Primitive::Centrifugation { .. } => "centrifugation",
            Primitive::Mix { .. } => "mix",
            Primitive::Electrophoresis { .. } => "electrophoresis",
            Primitive::MeasureOd { .. } => "measureOD",
            Primitive::MeasureFluorescence { .. } => "measureFluorescence",
        }
    }

    /// Every container the operation touches, in argument order.
    pub fn containers(&self) -> Vec<&str> {
        match self {
            Primitive::ContinuousFlow { path, .. } => path.iter().map(String::as_str).collect(),
            Primitive::Transfer { source, target, .. } => vec![source.as_str(), target.as_str()],
            Primitive::Incubate { container, .. }
            | Primitive::Centrifugation { container, .. }
            | Primitive::Mix { container, .. }
            | Primitive::Electrophoresis { container, .. }
            | Primitive::MeasureOd { container, .. }
            | Primitive::MeasureFluorescence { container, .. } => vec![container.as_str()],
        }
    }

    /// The numeric magnitude expressions of the operation's arguments.
    pub fn magnitudes(&self) -> Vec<&Expression> {
        match self {
            Primitive::ContinuousFlow { rate, .. } => vec![&rate.magnitude],
            Primitive::Transfer { volume, .. } => vec![&volume.magnitude],
            Primitive::Incubate {
                temperature,
                shaking,
                ..
            } => std::iter::once(&temperature.magnitude)
                .chain(shaking.iter().map(|s| &s.magnitude))
                .collect(),
            Primitive::Centrifugation {
                speed, temperature, ..
            } => std::iter::once(&speed.magnitude)
                .chain(temperature.iter().map(|t| &t.magnitude))
                .collect(),
            Primitive::Mix { frequency, .. } => vec![&frequency.magnitude],
            Primitive::Electrophoresis { field, .. } => vec![&field.magnitude],
            Primitive::MeasureOd {
                frequency,
                wavelength,
                ..
            } => vec![&frequency.magnitude, &wavelength.magnitude],
            Primitive::MeasureFluorescence {
                frequency,
                excitation,
                emission,
                ..
            } => vec![
                &frequency.magnitude,
                &excitation.magnitude,
                &emission.magnitude,
            ],
        }
    }

    /// The variable a measurement binds its reading to, if any.
    pub fn binding(&self) -> Option<&str> {
        match self {
            Primitive::MeasureOd { bind, .. } | Primitive::MeasureFluorescence { bind, .. } => {
                bind.as_deref()
            }
            _ => None,
        }
    }
}

/// When an operation or block starts relative to its sequencing scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Start {
    /// `-`: as soon as the previous operation of the scope has finished.
    AfterPrevious,
    At(Time),
}

/// How long an operation lasts, or the default duration a block hands to its body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Duration {
    /// Empty duration: taken from the enclosing block, or derived from the operation itself.
    Inherited,
    Fixed(Time),
}

/// The `[start:duration]` annotation attached to every operation and block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: Start,
    pub duration: Duration,
}

impl Window {
    pub fn new(start: Start, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// `[-:]`
    pub fn unspecified() -> Self {
        Self::new(Start::AfterPrevious, Duration::Inherited)
    }

    pub fn after_previous() -> Self {
        Self::unspecified()
    }

    pub fn at(start: Time) -> Self {
        Self::new(Start::At(start), Duration::Inherited)
    }

    pub fn lasting(mut self, duration: Time) -> Self {
        self.duration = Duration::Fixed(duration);
        self
    }

    pub fn fixed_duration(&self) -> Option<Time> {
        match self.duration {
            Duration::Fixed(t) => Some(t),
            Duration::Inherited => None,
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::unspecified()
    }
}

impl FromStr for Window {
    type Err = UnitError;

    /// Parses `[0s:30s]`, `[-:10s]`, `[5s:]` or `[-:]`. `_` and `x` are accepted as
    /// start placeholders as well.
    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        let malformed = || UnitError::MalformedWindow(literal.to_string());
        let inner = literal
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(malformed)?;
        let (start, duration) = inner.split_once(':').ok_or_else(malformed)?;

        let start = match start.trim() {
            "-" | "_" | "x" | "" => Start::AfterPrevious,
            time => Start::At(time.parse()?),
        };
        let duration = match duration.trim() {
            "" | "-" => Duration::Inherited,
            time => Duration::Fixed(time.parse()?),
        };
        Ok(Window { start, duration })
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Start::AfterPrevious => write!(f, "[-:")?,
            Start::At(t) => write!(f, "[{}:", t)?,
        }
        match self.duration {
            Duration::Inherited => write!(f, "]"),
            Duration::Fixed(t) => write!(f, "{}]", t),
        }
    }
}
