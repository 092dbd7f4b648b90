//! Translation of protocol descriptions into executable protocol graphs.

use crate::error::TranslationError;
use crate::evaluator::VariableStore;
use crate::graph::ProtocolGraph;
use crate::protocol::ProtocolDescription;
use crate::units::{FlowRate, Time};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

mod builder;
mod lowering;
mod scope;
mod timeline;

use lowering::Lowering;

/// Knobs of the translation, all of which have working defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Simulated time covered by one tick node.
    pub tick_interval: Time,
    /// Pump rate, in ml/h, used to derive the duration of transfers without a window.
    pub transfer_rate: f64,
    /// Ticks appended after the protocol body so pending stops can drain.
    pub settle_ticks: u32,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Time::from_secs(1.0),
            transfer_rate: 3600.0,
            settle_ticks: 2,
        }
    }
}

pub struct TranslatorBuilder {
    description: ProtocolDescription,
    config: TranslatorConfig,
    transfer_rate: Option<FlowRate>,
}

impl TranslatorBuilder {
    pub fn new(description: ProtocolDescription) -> Self {
        Self {
            description,
            config: TranslatorConfig::default(),
            transfer_rate: None,
        }
    }

    pub fn tick_interval(mut self, interval: Time) -> Self {
        self.config.tick_interval = interval;
        self
    }

    /// Sets the pump rate from a quantity; rates that reference variables are rejected at
    /// translation time.
    pub fn transfer_rate(mut self, rate: &FlowRate) -> Self {
        self.transfer_rate = Some(rate.clone());
        self
    }

    pub fn settle_ticks(mut self, ticks: u32) -> Self {
        self.config.settle_ticks = ticks;
        self
    }

    pub fn with_config(mut self, config: TranslatorConfig) -> Self {
        self.config = config;
        self.transfer_rate = None;
        self
    }

    pub fn build(self) -> Translator {
        Translator {
            description: self.description,
            config: self.config,
            transfer_rate: self.transfer_rate,
        }
    }
}

/// Turns a [`ProtocolDescription`] into a [`ProtocolGraph`].
pub struct Translator {
    description: ProtocolDescription,
    config: TranslatorConfig,
    /// Pump rate given as a quantity, resolved into `config` when translating.
    transfer_rate: Option<FlowRate>,
}

impl Translator {
    pub fn builder(description: ProtocolDescription) -> TranslatorBuilder {
        TranslatorBuilder::new(description)
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn description(&self) -> &ProtocolDescription {
        &self.description
    }

    /// Validates the description and emits its graph.
    ///
    /// The graph starts with the time step declaration and one load per container, then
    /// the lowered body, then the configured number of settle ticks.
    pub fn translate(&self) -> Result<ProtocolGraph, TranslationError> {
        let mut config = self.config.clone();
        if let Some(rate) = &self.transfer_rate {
            config.transfer_rate = rate.constant(&VariableStore::new()).ok_or_else(|| {
                TranslationError::NonConstant {
                    context: "The transfer rate".to_string(),
                    expression: rate.to_string(),
                }
            })?;
        }

        let tick = config.tick_interval.as_millis();
        if !tick.is_finite() || tick <= 0.0 {
            return Err(TranslationError::InvalidTickInterval(tick));
        }
        let rate = config.transfer_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(TranslationError::Structural(format!(
                "the transfer rate must be a positive constant, got {}",
                rate
            )));
        }

        let span = info_span!("translate", tick = %config.tick_interval);
        let _guard = span.enter();
        let graph = Lowering::new(&config).lower(&self.description)?;
        info!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            containers = self.description.containers.len(),
            "protocol translated"
        );
        Ok(graph)
    }
}
