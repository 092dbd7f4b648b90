use crate::error::ActuatorError;

mod recording;

pub use recording::CommandRecorder;

/// The boundary between the execution engine and the laboratory hardware.
///
/// One method per physical action. Every magnitude arrives in the canonical unit of its
/// dimension: milliseconds, millilitres, ml/h, degrees Celsius, Hz, nm and V/cm. Start and
/// stop calls come in matching order, `time_step` is called once per simulated tick, and a
/// measurement is issued and later retrieved with two separate synchronous calls.
pub trait ActuatorBackend {
    fn set_time_step(&mut self, millis: f64) -> Result<(), ActuatorError>;
    fn load_container(&mut self, container: &str, ml: f64) -> Result<(), ActuatorError>;

    fn set_continuous_flow(
        &mut self,
        source: &str,
        target: &str,
        ml_per_hour: f64,
    ) -> Result<(), ActuatorError>;
    fn stop_continuous_flow(&mut self, source: &str, target: &str) -> Result<(), ActuatorError>;

    fn transfer(&mut self, source: &str, target: &str, ml: f64) -> Result<(), ActuatorError>;
    fn stop_transfer(&mut self, source: &str, target: &str) -> Result<(), ActuatorError>;

    fn apply_temperature(&mut self, container: &str, celsius: f64)
    -> Result<(), ActuatorError>;
    fn stop_apply_temperature(&mut self, container: &str) -> Result<(), ActuatorError>;

    fn shake(&mut self, container: &str, hz: f64) -> Result<(), ActuatorError>;
    fn stop_shake(&mut self, container: &str) -> Result<(), ActuatorError>;

    fn stir(&mut self, container: &str, hz: f64) -> Result<(), ActuatorError>;
    fn stop_stir(&mut self, container: &str) -> Result<(), ActuatorError>;

    fn centrifugate(&mut self, container: &str, hz: f64) -> Result<(), ActuatorError>;
    fn stop_centrifugate(&mut self, container: &str) -> Result<(), ActuatorError>;

    fn start_electrophoresis(
        &mut self,
        container: &str,
        volts_per_cm: f64,
    ) -> Result<(), ActuatorError>;
    fn stop_electrophoresis(&mut self, container: &str) -> Result<(), ActuatorError>;

    fn measure_od(&mut self, container: &str, hz: f64, nm: f64) -> Result<(), ActuatorError>;
    fn get_measure_od(&mut self, container: &str) -> Result<f64, ActuatorError>;

    fn measure_fluorescence(
        &mut self,
        container: &str,
        hz: f64,
        excitation_nm: f64,
        emission_nm: f64,
    ) -> Result<(), ActuatorError>;
    fn get_measure_fluorescence(&mut self, container: &str) -> Result<f64, ActuatorError>;

    /// Advances the hardware clock by one tick.
    fn time_step(&mut self) -> Result<(), ActuatorError>;
}
