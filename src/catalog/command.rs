use crate::units::format_number;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One actuator call with its arguments already evaluated to canonical units.
///
/// `Display` renders the call in the textual command vocabulary shared by every backend,
/// e.g. `setContinuosFlow(A,B,10ml/h)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    SetTimeStep { millis: f64 },
    LoadContainer { container: String, ml: f64 },
    SetContinuousFlow {
        source: String,
        target: String,
        ml_per_hour: f64,
    },
    StopContinuousFlow { source: String, target: String },
    Transfer {
        source: String,
        target: String,
        ml: f64,
    },
    StopTransfer { source: String, target: String },
    ApplyTemperature { container: String, celsius: f64 },
    StopApplyTemperature { container: String },
    Shake { container: String, hz: f64 },
    StopShake { container: String },
    Stir { container: String, hz: f64 },
    StopStir { container: String },
    Centrifugate { container: String, hz: f64 },
    StopCentrifugate { container: String },
    StartElectrophoresis {
        container: String,
        volts_per_cm: f64,
    },
    StopElectrophoresis { container: String },
    MeasureOd { container: String, hz: f64, nm: f64 },
    GetMeasureOd { container: String },
    MeasureFluorescence {
        container: String,
        hz: f64,
        excitation_nm: f64,
        emission_nm: f64,
    },
    GetMeasureFluorescence { container: String },
    TimeStep,
}

impl Command {
    pub fn is_time_step(&self) -> bool {
        matches!(self, Command::TimeStep)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = format_number;
        match self {
            Command::SetTimeStep { millis } => write!(f, "setTimeStep({}ms)", n(*millis)),
            Command::LoadContainer { container, ml } => {
                write!(f, "loadContainer({},{}ml)", container, n(*ml))
            }
            // The misspelling is part of the command vocabulary.
            Command::SetContinuousFlow {
                source,
                target,
                ml_per_hour,
            } => write!(
                f,
                "setContinuosFlow({},{},{}ml/h)",
                source,
                target,
                n(*ml_per_hour)
            ),
            Command::StopContinuousFlow { source, target } => {
                write!(f, "stopContinuosFlow({},{})", source, target)
            }
            Command::Transfer { source, target, ml } => {
                write!(f, "transfer({},{},{}ml)", source, target, n(*ml))
            }
            Command::StopTransfer { source, target } => {
                write!(f, "stopTransfer({},{})", source, target)
            }
            Command::ApplyTemperature { container, celsius } => {
                write!(f, "applyTemperature({},{}Cº)", container, n(*celsius))
            }
            Command::StopApplyTemperature { container } => {
                write!(f, "stopApplyTemperature({})", container)
            }
            Command::Shake { container, hz } => write!(f, "shake({},{}Hz)", container, n(*hz)),
            Command::StopShake { container } => write!(f, "stopShake({})", container),
            Command::Stir { container, hz } => write!(f, "stir({},{}Hz)", container, n(*hz)),
            Command::StopStir { container } => write!(f, "stopStir({})", container),
            Command::Centrifugate { container, hz } => {
                write!(f, "centrifugate({},{}Hz)", container, n(*hz))
            }
            Command::StopCentrifugate { container } => {
                write!(f, "stopCentrifugate({})", container)
            }
            Command::StartElectrophoresis {
                container,
                volts_per_cm,
            } => write!(
                f,
                "startElectrophoresis({},{}V/cm)",
                container,
                n(*volts_per_cm)
            ),
            Command::StopElectrophoresis { container } => {
                write!(f, "stopElectrophoresis({})", container)
            }
            Command::MeasureOd { container, hz, nm } => {
                write!(f, "measureOD({},{}Hz,{}nm)", container, n(*hz), n(*nm))
            }
            Command::GetMeasureOd { container } => write!(f, "getMeasureOD({})", container),
            Command::MeasureFluorescence {
                container,
                hz,
                excitation_nm,
                emission_nm,
            } => write!(
                f,
                "measureFluorescence({},{}Hz,{}nm, {}nm)",
                container,
                n(*hz),
                n(*excitation_nm),
                n(*emission_nm)
            ),
            Command::GetMeasureFluorescence { container } => {
                write!(f, "getMeasureFluorescence({})", container)
            }
            Command::TimeStep => write!(f, "timeStep()"),
        }
    }
}
