//! Physical units, unit-suffixed quantities and the numeric rendering used by actuator commands.
//!
//! Every dimension has a canonical unit (ml, ml/h, ms, Hz, ºC, nm, V/cm). Quantities are
//! converted into it when they are evaluated, so actuator backends only ever see canonical
//! magnitudes.

use crate::ast::Expression;
use crate::error::{EvaluationError, UnitError};
use crate::evaluator::VariableStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A unit of one physical dimension.
pub trait Unit: Copy + fmt::Debug + PartialEq + Serialize + DeserializeOwned + 'static {
    /// Human-readable dimension name, used in error messages.
    const DIMENSION: &'static str;
    /// The unit every magnitude of this dimension is converted into.
    const CANONICAL: Self;

    fn symbol(&self) -> &'static str;
    fn to_canonical(&self, magnitude: f64) -> f64;
    fn from_symbol(symbol: &str) -> Option<Self>;
}

/// Master macro to define every unit enum together with its symbols and conversions.
macro_rules! define_units {
    ( $(
        $(#[$meta:meta])*
        $name:ident ($dimension:literal, canonical = $canonical:ident) {
            $(
                $variant:ident => $symbol:literal,
                scale = $scale:expr,
                offset = $offset:expr,
                aliases = [$($alias:literal),*]
            );+ $(;)?
        }
    )* ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            pub enum $name {
                $( $variant ),+
            }

            impl Unit for $name {
                const DIMENSION: &'static str = $dimension;
                const CANONICAL: Self = $name::$canonical;

                fn symbol(&self) -> &'static str {
                    match self {
                        $( $name::$variant => $symbol, )+
                    }
                }

                fn to_canonical(&self, magnitude: f64) -> f64 {
                    match self {
                        $( $name::$variant => magnitude * $scale + $offset, )+
                    }
                }

                fn from_symbol(symbol: &str) -> Option<Self> {
                    let lowered = symbol.trim().to_lowercase();
                    $(
                        if lowered == $symbol.to_lowercase() $( || lowered == $alias )* {
                            return Some($name::$variant);
                        }
                    )+
                    None
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.symbol())
                }
            }
        )*
    };
}

define_units! {
    VolumeUnit("volume", canonical = Milliliter) {
        Milliliter => "ml", scale = 1.0, offset = 0.0, aliases = ["milliliter", "millilitre"];
        Microliter => "ul", scale = 1e-3, offset = 0.0, aliases = ["µl", "μl"];
        Liter => "l", scale = 1e3, offset = 0.0, aliases = ["liter", "litre"];
    }

    FlowUnit("flow rate", canonical = MlPerHour) {
        MlPerHour => "ml/h", scale = 1.0, offset = 0.0, aliases = ["ml/hr"];
        MlPerMinute => "ml/min", scale = 60.0, offset = 0.0, aliases = [];
        MlPerSecond => "ml/s", scale = 3600.0, offset = 0.0, aliases = ["ml/sec"];
        MlPerMillisecond => "ml/ms", scale = 3.6e6, offset = 0.0, aliases = [];
        UlPerHour => "ul/h", scale = 1e-3, offset = 0.0, aliases = ["ul/hr", "µl/h"];
    }

    TimeUnit("time", canonical = Millisecond) {
        Millisecond => "ms", scale = 1.0, offset = 0.0, aliases = [];
        Second => "s", scale = 1e3, offset = 0.0, aliases = ["sec"];
        Minute => "min", scale = 6e4, offset = 0.0, aliases = [];
        Hour => "h", scale = 3.6e6, offset = 0.0, aliases = ["hr"];
    }

    FrequencyUnit("frequency", canonical = Hertz) {
        Hertz => "Hz", scale = 1.0, offset = 0.0, aliases = [];
        Kilohertz => "kHz", scale = 1e3, offset = 0.0, aliases = [];
        Rpm => "rpm", scale = 1.0 / 60.0, offset = 0.0, aliases = [];
    }

    TemperatureUnit("temperature", canonical = Celsius) {
        Celsius => "Cº", scale = 1.0, offset = 0.0, aliases = ["ºc", "°c", "c", "celsius"];
        Kelvin => "K", scale = 1.0, offset = -273.15, aliases = ["kelvin"];
    }

    WavelengthUnit("wavelength", canonical = Nanometer) {
        Nanometer => "nm", scale = 1.0, offset = 0.0, aliases = [];
        Micrometer => "um", scale = 1e3, offset = 0.0, aliases = ["µm", "μm"];
    }

    FieldUnit("electric field", canonical = VoltPerCentimeter) {
        VoltPerCentimeter => "V/cm", scale = 1.0, offset = 0.0, aliases = [];
        VoltPerMillimeter => "V/mm", scale = 10.0, offset = 0.0, aliases = [];
    }
}

/// A magnitude expression paired with its unit.
///
/// The magnitude may reference protocol variables (for example a flow rate recomputed on
/// every loop iteration), so it is only converted to a number when the operation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount<U> {
    pub magnitude: Expression,
    pub unit: U,
}

impl<U: Unit> Amount<U> {
    pub fn new(magnitude: f64, unit: U) -> Self {
        Self {
            magnitude: Expression::number(magnitude),
            unit,
        }
    }

    pub fn of(magnitude: Expression, unit: U) -> Self {
        Self { magnitude, unit }
    }

    /// Evaluates the magnitude and converts it to the canonical unit.
    pub fn evaluate(&self, store: &VariableStore) -> Result<f64, EvaluationError> {
        let magnitude = store.evaluate_number(&self.magnitude)?;
        Ok(self.unit.to_canonical(magnitude))
    }

    /// The canonical magnitude when it does not depend on any variable outside `constants`.
    pub fn constant(&self, constants: &VariableStore) -> Option<f64> {
        self.evaluate(constants).ok()
    }
}

impl<U: Unit> FromStr for Amount<U> {
    type Err = UnitError;

    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        let (magnitude, symbol) = split_quantity(literal)?;
        let unit = U::from_symbol(symbol).ok_or_else(|| UnitError::UnknownUnit {
            dimension: U::DIMENSION,
            unit: symbol.to_string(),
            literal: literal.to_string(),
        })?;
        Ok(Self::new(magnitude, unit))
    }
}

impl<U: Unit> fmt::Display for Amount<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.magnitude {
            Expression::Literal(_) | Expression::Variable(_) => {
                write!(f, "{}{}", self.magnitude, self.unit.symbol())
            }
            other => write!(f, "({}){}", other, self.unit.symbol()),
        }
    }
}

pub type Volume = Amount<VolumeUnit>;
pub type FlowRate = Amount<FlowUnit>;
pub type Frequency = Amount<FrequencyUnit>;
pub type Temperature = Amount<TemperatureUnit>;
pub type Wavelength = Amount<WavelengthUnit>;
pub type FieldStrength = Amount<FieldUnit>;

/// A constant span of simulated time, stored in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Time {
    millis: f64,
}

impl Time {
    pub const ZERO: Time = Time { millis: 0.0 };

    pub fn from_millis(millis: f64) -> Self {
        Self { millis }
    }

    pub fn from_secs(secs: f64) -> Self {
        Self {
            millis: secs * 1e3,
        }
    }

    pub fn as_millis(&self) -> f64 {
        self.millis
    }

    /// Number of whole ticks of length `tick` needed to cover this span, rounding up.
    ///
    /// `tick` must be positive.
    pub fn ticks(&self, tick: Time) -> u64 {
        if self.millis <= 0.0 {
            return 0;
        }
        // Absorb representation error so that exact multiples do not gain an extra tick.
        let exact = self.millis / tick.millis - 1e-9;
        exact.ceil().max(0.0) as u64
    }

    pub fn times(&self, n: u64) -> Time {
        Time {
            millis: self.millis * n as f64,
        }
    }
}

impl FromStr for Time {
    type Err = UnitError;

    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        let (magnitude, symbol) = split_quantity(literal)?;
        let unit = TimeUnit::from_symbol(symbol).ok_or_else(|| UnitError::UnknownUnit {
            dimension: TimeUnit::DIMENSION,
            unit: symbol.to_string(),
            literal: literal.to_string(),
        })?;
        Ok(Time::from_millis(unit.to_canonical(magnitude)))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", format_number(self.millis))
    }
}

/// Splits a literal such as `"10ml/h"` or `"2.5 s"` into its magnitude and unit symbol.
fn split_quantity(literal: &str) -> Result<(f64, &str), UnitError> {
    let text = literal.trim();
    let bytes = text.as_bytes();
    let mut end = 0;
    if end < bytes.len() && matches!(bytes[end], b'+' | b'-') {
        end += 1;
    }
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exponent = end + 1;
        if exponent < bytes.len() && matches!(bytes[exponent], b'+' | b'-') {
            exponent += 1;
        }
        if exponent < bytes.len() && bytes[exponent].is_ascii_digit() {
            end = exponent;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
    }
    let magnitude = text[..end]
        .parse::<f64>()
        .map_err(|_| UnitError::MissingMagnitude(literal.to_string()))?;
    Ok((magnitude, text[end..].trim()))
}

/// Renders a number the way a default-configured C++ output stream does: six significant
/// digits, trailing zeros removed, scientific notation outside `[1e-4, 1e6)`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let scientific = format!("{:.5e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let precision = (5 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", precision, value)).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_like_a_stream() {
        assert_eq!(format_number(10000.0), "10000");
        assert_eq!(format_number(50000.0), "50000");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(151.2), "151.2");
        assert_eq!(format_number(7.2e7), "7.2e+07");
        assert_eq!(format_number(150.0 - 150.0 * (1.0 - 0.8)), "120");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(-3.25), "-3.25");
    }

    #[test]
    fn splits_magnitude_from_unit() {
        assert_eq!(split_quantity("10ml/h"), Ok((10.0, "ml/h")));
        assert_eq!(split_quantity(" 2.5 s "), Ok((2.5, "s")));
        assert_eq!(split_quantity("1e3ml"), Ok((1000.0, "ml")));
        assert_eq!(split_quantity("-1"), Ok((-1.0, "")));
        assert!(split_quantity("ml").is_err());
    }

    #[test]
    fn tick_count_rounds_up() {
        let tick = Time::from_millis(200.0);
        assert_eq!(Time::from_secs(2.0).ticks(tick), 10);
        assert_eq!(Time::from_millis(500.0).ticks(tick), 3);
        assert_eq!(Time::from_millis(1500.0).ticks(tick), 8);
        assert_eq!(Time::ZERO.ticks(tick), 0);
    }
}
