//! Conversion of unconverted option strings into [`OptionValue`]s.
//!
//! The parser never converts values while ingesting tokens; it calls a
//! [`Converter`] when an effective value is requested. [`DefaultConverter`]
//! drives conversion from each definition's [`ValueKind`] and [`ValueType`].
//! Any closure with the right signature is also a converter.

use thiserror::Error;

use crate::{OptionDefinition, OptionValue, ValueKind, ValueType};

/// A converter rejected an unconverted value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("while parsing option --{option}: '{value}' {reason}")]
pub struct ConversionError {
    /// Option name.
    pub option: String,
    /// The rejected unconverted value.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

impl ConversionError {
    /// Creates an error for `definition`.
    pub fn new(definition: &OptionDefinition, value: &str, reason: impl Into<String>) -> Self {
        Self {
            option: definition.name.clone(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Turns one unconverted string into a typed value.
pub trait Converter {
    /// Converts `raw` for `definition`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] if `raw` is not acceptable.
    fn convert(&self, definition: &OptionDefinition, raw: &str)
    -> Result<OptionValue, ConversionError>;
}

impl<F> Converter for F
where
    F: Fn(&OptionDefinition, &str) -> Result<OptionValue, ConversionError>,
{
    fn convert(
        &self,
        definition: &OptionDefinition,
        raw: &str,
    ) -> Result<OptionValue, ConversionError> {
        self(definition, raw)
    }
}

/// Converter driven by [`ValueKind`] and [`ValueType`].
///
/// # Examples
///
/// ```
/// use option_precedence_core::*;
///
/// let jobs = OptionDefinition::single("jobs", ValueType::Number);
/// assert_eq!(DefaultConverter.convert(&jobs, "8").unwrap(), OptionValue::Int(8));
/// assert!(DefaultConverter.convert(&jobs, "eight").is_err());
///
/// let verbose = OptionDefinition::boolean("verbose");
/// assert_eq!(DefaultConverter.convert(&verbose, "yes").unwrap(), OptionValue::Bool(true));
///
/// let tags = OptionDefinition::repeated("tags", ValueType::String);
/// assert_eq!(
///     DefaultConverter.convert(&tags, "a,b").unwrap(),
///     OptionValue::List(vec![OptionValue::Str("a".into()), OptionValue::Str("b".into())]),
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl Converter for DefaultConverter {
    fn convert(
        &self,
        definition: &OptionDefinition,
        raw: &str,
    ) -> Result<OptionValue, ConversionError> {
        match definition.kind {
            ValueKind::Boolean => parse_bool(raw)
                .map(OptionValue::Bool)
                .ok_or_else(|| ConversionError::new(definition, raw, "is not a boolean")),
            ValueKind::Void if !definition.wrapper => Ok(OptionValue::Unit),
            ValueKind::Repeated => raw
                .split(',')
                .filter(|part| !part.is_empty())
                .map(|part| convert_scalar(definition, part))
                .collect::<Result<Vec<_>, _>>()
                .map(OptionValue::List),
            ValueKind::Single | ValueKind::Void => convert_scalar(definition, raw),
        }
    }
}

fn convert_scalar(definition: &OptionDefinition, raw: &str) -> Result<OptionValue, ConversionError> {
    match &definition.value_type {
        ValueType::String | ValueType::Path | ValueType::Any => Ok(OptionValue::Str(raw.to_string())),
        ValueType::Number => raw
            .trim()
            .parse::<i64>()
            .map(OptionValue::Int)
            .map_err(|_| ConversionError::new(definition, raw, "is not an int")),
        ValueType::Float => raw
            .trim()
            .parse::<f64>()
            .map(OptionValue::Float)
            .map_err(|_| ConversionError::new(definition, raw, "is not a number")),
        ValueType::Choice(choices) => {
            if choices.iter().any(|c| c == raw) {
                Ok(OptionValue::Str(raw.to_string()))
            } else {
                Err(ConversionError::new(
                    definition,
                    raw,
                    format!("is not one of {}", choices.join(", ")),
                ))
            }
        }
    }
}

/// Parses the boolean spellings accepted on the command line.
///
/// # Examples
///
/// ```
/// use option_precedence_core::parse_bool;
///
/// assert_eq!(parse_bool("1"), Some(true));
/// assert_eq!(parse_bool("FALSE"), Some(false));
/// assert_eq!(parse_bool("maybe"), None);
/// ```
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
