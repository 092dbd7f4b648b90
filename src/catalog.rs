//! The operation catalog: every step a protocol graph node can perform.

pub mod command;

use crate::ast::{Expression, Value};
use crate::backend::ActuatorBackend;
use crate::error::OperationError;
use crate::evaluator::VariableStore;
use crate::units::{FieldStrength, FlowRate, Frequency, Temperature, Time, Volume, Wavelength};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use command::Command;

/// Where an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Computed against the variable store, no physical effect.
    Cpu,
    /// Forwarded to the actuator backend.
    Actuator,
}

/// The control structure an `EvaluateCondition` node opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionBlock {
    Branch,
    Loop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    // CPU
    AssignVariable {
        variable: String,
        value: Expression,
    },
    /// Entry point of a branch or loop; its outgoing edges carry the conditions.
    EvaluateCondition {
        block: ConditionBlock,
    },

    // One-shot actuator calls
    SetTimeStep {
        interval: Time,
    },
    LoadContainer {
        container: String,
        volume: Volume,
    },

    // Start / stop pairs
    SetContinuousFlow {
        source: String,
        target: String,
        rate: FlowRate,
    },
    StopContinuousFlow {
        source: String,
        target: String,
    },
    Transfer {
        source: String,
        target: String,
        volume: Volume,
    },
    StopTransfer {
        source: String,
        target: String,
    },
    ApplyTemperature {
        container: String,
        temperature: Temperature,
    },
    StopApplyTemperature {
        container: String,
    },
    Shake {
        container: String,
        frequency: Frequency,
    },
    StopShake {
        container: String,
    },
    Stir {
        container: String,
        frequency: Frequency,
    },
    StopStir {
        container: String,
    },
    Centrifugate {
        container: String,
        speed: Frequency,
    },
    StopCentrifugate {
        container: String,
    },
    StartElectrophoresis {
        container: String,
        field: FieldStrength,
    },
    StopElectrophoresis {
        container: String,
    },

    // Measurements: issue, then retrieve and bind
    MeasureOd {
        container: String,
        frequency: Frequency,
        wavelength: Wavelength,
    },
    GetMeasureOd {
        container: String,
        bind: Option<String>,
    },
    MeasureFluorescence {
        container: String,
        frequency: Frequency,
        excitation: Wavelength,
        emission: Wavelength,
    },
    GetMeasureFluorescence {
        container: String,
        bind: Option<String>,
    },

    /// Advances the simulated clock by one tick.
    Tick,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::AssignVariable { .. } | Operation::EvaluateCondition { .. } => {
                OperationKind::Cpu
            }
            Operation::SetTimeStep { .. }
            | Operation::LoadContainer { .. }
            | Operation::SetContinuousFlow { .. }
            | Operation::StopContinuousFlow { .. }
            | Operation::Transfer { .. }
            | Operation::StopTransfer { .. }
            | Operation::ApplyTemperature { .. }
            | Operation::StopApplyTemperature { .. }
            | Operation::Shake { .. }
            | Operation::StopShake { .. }
            | Operation::Stir { .. }
            | Operation::StopStir { .. }
            | Operation::Centrifugate { .. }
            | Operation::StopCentrifugate { .. }
            | Operation::StartElectrophoresis { .. }
            | Operation::StopElectrophoresis { .. }
            | Operation::MeasureOd { .. }
            | Operation::GetMeasureOd { .. }
            | Operation::MeasureFluorescence { .. }
            | Operation::GetMeasureFluorescence { .. }
            | Operation::Tick => OperationKind::Actuator,
        }
    }

    pub fn is_tick(&self) -> bool {
        matches!(self, Operation::Tick)
    }

    /// Runs the operation: CPU operations against `store`, actuator operations against
    /// `backend`. Arguments are evaluated at call time, so they observe the latest
    /// variable values.
    pub fn execute(
        &self,
        store: &mut VariableStore,
        backend: &mut dyn ActuatorBackend,
    ) -> Result<(), OperationError> {
        match self {
            Operation::AssignVariable { variable, value } => {
                let value = store.evaluate(value)?;
                store.set(variable.clone(), value);
            }
            Operation::EvaluateCondition { .. } => {}
            Operation::SetTimeStep { interval } => backend.set_time_step(interval.as_millis())?,
            Operation::LoadContainer { container, volume } => {
                backend.load_container(container, volume.evaluate(store)?)?
            }
            Operation::SetContinuousFlow {
                source,
                target,
                rate,
            } => backend.set_continuous_flow(source, target, rate.evaluate(store)?)?,
            Operation::StopContinuousFlow { source, target } => {
                backend.stop_continuous_flow(source, target)?
            }
            Operation::Transfer {
                source,
                target,
                volume,
            } => backend.transfer(source, target, volume.evaluate(store)?)?,
            Operation::StopTransfer { source, target } => backend.stop_transfer(source, target)?,
            Operation::ApplyTemperature {
                container,
                temperature,
            } => backend.apply_temperature(container, temperature.evaluate(store)?)?,
            Operation::StopApplyTemperature { container } => {
                backend.stop_apply_temperature(container)?
            }
            Operation::Shake {
                container,
                frequency,
            } => backend.shake(container, frequency.evaluate(store)?)?,
            Operation::StopShake { container } => backend.stop_shake(container)?,
            Operation::Stir {
                container,
                frequency,
            } => backend.stir(container, frequency.evaluate(store)?)?,
            Operation::StopStir { container } => backend.stop_stir(container)?,
            Operation::Centrifugate { container, speed } => {
                backend.centrifugate(container, speed.evaluate(store)?)?
            }
            Operation::StopCentrifugate { container } => backend.stop_centrifugate(container)?,
            Operation::StartElectrophoresis { container, field } => {
                backend.start_electrophoresis(container, field.evaluate(store)?)?
            }
            Operation::StopElectrophoresis { container } => {
                backend.stop_electrophoresis(container)?
            }
            Operation::MeasureOd {
                container,
                frequency,
                wavelength,
            } => backend.measure_od(
                container,
                frequency.evaluate(store)?,
                wavelength.evaluate(store)?,
            )?,
            Operation::GetMeasureOd { container, bind } => {
                let reading = backend.get_measure_od(container)?;
                if let Some(variable) = bind {
                    store.set(variable.clone(), Value::Number(reading));
                }
            }
            Operation::MeasureFluorescence {
                container,
                frequency,
                excitation,
                emission,
            } => backend.measure_fluorescence(
                container,
                frequency.evaluate(store)?,
                excitation.evaluate(store)?,
                emission.evaluate(store)?,
            )?,
            Operation::GetMeasureFluorescence { container, bind } => {
                let reading = backend.get_measure_fluorescence(container)?;
                if let Some(variable) = bind {
                    store.set(variable.clone(), Value::Number(reading));
                }
            }
            Operation::Tick => backend.time_step()?,
        }
        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AssignVariable { variable, value } => write!(f, "{} = {}", variable, value),
            Operation::EvaluateCondition { block } => match block {
                ConditionBlock::Branch => write!(f, "branch"),
                ConditionBlock::Loop => write!(f, "loop"),
            },
            Operation::SetTimeStep { interval } => write!(f, "setTimeStep({})", interval),
            Operation::LoadContainer { container, volume } => {
                write!(f, "loadContainer({}, {})", container, volume)
            }
            Operation::SetContinuousFlow {
                source,
                target,
                rate,
            } => write!(f, "setContinuousFlow({}, {}, {})", source, target, rate),
            Operation::StopContinuousFlow { source, target } => {
                write!(f, "stopContinuousFlow({}, {})", source, target)
            }
            Operation::Transfer {
                source,
                target,
                volume,
            } => write!(f, "transfer({}, {}, {})", source, target, volume),
            Operation::StopTransfer { source, target } => {
                write!(f, "stopTransfer({}, {})", source, target)
            }
            Operation::ApplyTemperature {
                container,
                temperature,
            } => write!(f, "applyTemperature({}, {})", container, temperature),
            Operation::StopApplyTemperature { container } => {
                write!(f, "stopApplyTemperature({})", container)
            }
            Operation::Shake {
                container,
                frequency,
            } => write!(f, "shake({}, {})", container, frequency),
            Operation::StopShake { container } => write!(f, "stopShake({})", container),
            Operation::Stir {
                container,
                frequency,
            } => write!(f, "stir({}, {})", container, frequency),
            Operation::StopStir { container } => write!(f, "stopStir({})", container),
            Operation::Centrifugate { container, speed } => {
                write!(f, "centrifugate({}, {})", container, speed)
            }
            Operation::StopCentrifugate { container } => {
                write!(f, "stopCentrifugate({})", container)
            }
            Operation::StartElectrophoresis { container, field } => {
                write!(f, "startElectrophoresis({}, {})", container, field)
            }
            Operation::StopElectrophoresis { container } => {
                write!(f, "stopElectrophoresis({})", container)
            }
            Operation::MeasureOd {
                container,
                frequency,
                wavelength,
            } => write!(f, "measureOD({}, {}, {})", container, frequency, wavelength),
            Operation::GetMeasureOd { container, bind } => match bind {
                Some(variable) => write!(f, "{} = getMeasureOD({})", variable, container),
                None => write!(f, "getMeasureOD({})", container),
            },
            Operation::MeasureFluorescence {
                container,
                frequency,
                excitation,
                emission,
            } => write!(
                f,
                "measureFluorescence({}, {}, {}, {})",
                container, frequency, excitation, emission
            ),
            Operation::GetMeasureFluorescence { container, bind } => match bind {
                Some(variable) => write!(f, "{} = getMeasureFluorescence({})", variable, container),
                None => write!(f, "getMeasureFluorescence({})", container),
            },
            Operation::Tick => write!(f, "tick"),
        }
    }
}
