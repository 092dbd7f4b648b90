use super::ActuatorBackend;
use crate::catalog::Command;
use crate::error::ActuatorError;
use itertools::Itertools;
use std::collections::VecDeque;

/// A backend that records every call and answers measurements from a script.
///
/// Readings are handed out in order regardless of which container or technique asked for
/// them. Running out of readings is an error.
#[derive(Debug, Clone, Default)]
pub struct CommandRecorder {
    commands: Vec<Command>,
    measurements: VecDeque<f64>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_measurements(measurements: impl IntoIterator<Item = f64>) -> Self {
        Self {
            commands: Vec::new(),
            measurements: measurements.into_iter().collect(),
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Readings not consumed by the run.
    pub fn remaining_measurements(&self) -> usize {
        self.measurements.len()
    }

    /// The recorded calls as one string, each terminated by `;`.
    pub fn stream(&self) -> String {
        self.commands.iter().map(|c| format!("{};", c)).join("")
    }

    fn record(&mut self, command: Command) -> Result<(), ActuatorError> {
        self.commands.push(command);
        Ok(())
    }

    fn next_reading(&mut self, container: &str) -> Result<f64, ActuatorError> {
        self.measurements
            .pop_front()
            .ok_or_else(|| ActuatorError::MeasurementsExhausted(container.to_string()))
    }
}

impl ActuatorBackend for CommandRecorder {
    fn set_time_step(&mut self, millis: f64) -> Result<(), ActuatorError> {
        self.record(Command::SetTimeStep { millis })
    }

    fn load_container(&mut self, container: &str, ml: f64) -> Result<(), ActuatorError> {
        self.record(Command::LoadContainer {
            container: container.to_string(),
            ml,
        })
    }

    fn set_continuous_flow(
        &mut self,
        source: &str,
        target: &str,
        ml_per_hour: f64,
    ) -> Result<(), ActuatorError> {
        self.record(Command::SetContinuousFlow {
            source: source.to_string(),
            target: target.to_string(),
            ml_per_hour,
        })
    }

    fn stop_continuous_flow(&mut self, source: &str, target: &str) -> Result<(), ActuatorError> {
        self.record(Command::StopContinuousFlow {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    fn transfer(&mut self, source: &str, target: &str, ml: f64) -> Result<(), ActuatorError> {
        self.record(Command::Transfer {
            source: source.to_string(),
            target: target.to_string(),
            ml,
        })
    }

    fn stop_transfer(&mut self, source: &str, target: &str) -> Result<(), ActuatorError> {
        self.record(Command::StopTransfer {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    fn apply_temperature(
        &mut self,
        container: &str,
        celsius: f64,
    ) -> Result<(), ActuatorError> {
        self.record(Command::ApplyTemperature {
            container: container.to_string(),
            celsius,
        })
    }

    fn stop_apply_temperature(&mut self, container: &str) -> Result<(), ActuatorError> {
        self.record(Command::StopApplyTemperature {
            container: container.to_string(),
        })
    }

    fn shake(&mut self, container: &str, hz: f64) -> Result<(), ActuatorError> {
        self.record(Command::Shake {
            container: container.to_string(),
            hz,
        })
    }

    fn stop_shake(&mut self, container: &str) -> Result<(), ActuatorError> {
        self.record(Command::StopShake {
            container: container.to_string(),
        })
    }

    fn stir(&mut self, container: &str, hz: f64) -> Result<(), ActuatorError> {
        self.record(Command::Stir {
            container: container.to_string(),
            hz,
        })
    }

    fn stop_stir(&mut self, container: &str) -> Result<(), ActuatorError> {
        self.record(Command::StopStir {
            container: container.to_string(),
        })
    }

    fn centrifugate(&mut self, container: &str, hz: f64) -> Result<(), ActuatorError> {
        self.record(Command::Centrifugate {
            container: container.to_string(),
            hz,
        })
    }

    fn stop_centrifugate(&mut self, container: &str) -> Result<(), ActuatorError> {
        self.record(Command::StopCentrifugate {
            container: container.to_string(),
        })
    }

    fn start_electrophoresis(
        &mut self,
        container: &str,
        volts_per_cm: f64,
    ) -> Result<(), ActuatorError> {
        self.record(Command::StartElectrophoresis {
            container: container.to_string(),
            volts_per_cm,
        })
    }

    fn stop_electrophoresis(&mut self, container: &str) -> Result<(), ActuatorError> {
        self.record(Command::StopElectrophoresis {
            container: container.to_string(),
        })
    }

    fn measure_od(&mut self, container: &str, hz: f64, nm: f64) -> Result<(), ActuatorError> {
        self.record(Command::MeasureOd {
            container: container.to_string(),
            hz,
            nm,
        })
    }

    fn get_measure_od(&mut self, container: &str) -> Result<f64, ActuatorError> {
        self.record(Command::GetMeasureOd {
            container: container.to_string(),
        })?;
        self.next_reading(container)
    }

    fn measure_fluorescence(
        &mut self,
        container: &str,
        hz: f64,
        excitation_nm: f64,
        emission_nm: f64,
    ) -> Result<(), ActuatorError> {
        self.record(Command::MeasureFluorescence {
            container: container.to_string(),
            hz,
            excitation_nm,
            emission_nm,
        })
    }

    fn get_measure_fluorescence(&mut self, container: &str) -> Result<f64, ActuatorError> {
        self.record(Command::GetMeasureFluorescence {
            container: container.to_string(),
        })?;
        self.next_reading(container)
    }

    fn time_step(&mut self) -> Result<(), ActuatorError> {
        self.record(Command::TimeStep)
    }
}
