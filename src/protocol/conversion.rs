use super::definition::ProtocolDescription;
use crate::error::ConversionError;

/// A trait for custom data models that can be converted into a `ProtocolDescription`.
///
/// This is the extension point that keeps the translator format-agnostic. Parse your own
/// protocol format (JSON, a DSL, a UI export) into your own structs and implement this
/// trait to hand the result over.
///
/// # Example
///
/// ```rust,no_run
/// use protograph::prelude::*;
/// use std::result::Result;
///
/// struct MyFlow { from: String, to: String, rate: String, seconds: f64 }
///
/// impl IntoProtocol for MyFlow {
///     fn into_protocol(self) -> Result<ProtocolDescription, ConversionError> {
///         ProtocolBuilder::new()
///             .container(&self.from, Volume::new(1.0, VolumeUnit::Milliliter))
///             .container(&self.to, Volume::new(0.0, VolumeUnit::Milliliter))
///             .operation(
///                 Window::at(Time::ZERO).lasting(Time::from_secs(self.seconds)),
///                 Primitive::ContinuousFlow {
///                     path: vec![self.from, self.to],
///                     rate: self.rate.parse()?,
///                 },
///             )
///             .build()
///             .map_err(|e| ConversionError::ValidationError(e.to_string()))
///     }
/// }
/// ```
pub trait IntoProtocol {
    /// Consumes the object and converts it into a translatable protocol description.
    fn into_protocol(self) -> Result<ProtocolDescription, ConversionError>;
}

impl IntoProtocol for ProtocolDescription {
    fn into_protocol(self) -> Result<ProtocolDescription, ConversionError> {
        Ok(self)
    }
}
