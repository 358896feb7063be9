//! Typed experiment parameters: raw specifications and expanded conditions.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::NwgError;

/// Reserved option that switches a block into single-trial mode.
pub const MODE_KEY: &str = "experiment";
/// Value of [`MODE_KEY`] that suppresses Cartesian expansion.
pub const SINGLE_TRIAL: &str = "single";

/// Atomic configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Explicit absence (`None` in configuration files).
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// String literal, or any text that did not parse as another scalar.
    Str(String),
}

impl Scalar {
    /// Returns the value as a float when numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(value) => Some(*value as f64),
            Scalar::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as an integer when it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(value) => Some(*value),
            Scalar::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    /// Returns the value as a boolean. Integers are truthy when non-zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(value) => Some(*value),
            Scalar::Int(value) => Some(*value != 0),
            Scalar::Null => Some(false),
            _ => None,
        }
    }

    /// Returns the string payload of a [`Scalar::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(value) => Some(value),
            _ => None,
        }
    }

    /// True for [`Scalar::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "None"),
            Scalar::Bool(true) => write!(f, "True"),
            Scalar::Bool(false) => write!(f, "False"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Str(value) => write!(f, "{value}"),
        }
    }
}

/// Option value: a single scalar or an ordered sweep axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Fixed value.
    Scalar(Scalar),
    /// Ordered collection of values; marks a swept axis.
    List(Vec<Scalar>),
}

impl ParamValue {
    /// Returns the scalar payload, if this is not a sweep axis.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ParamValue::Scalar(value) => Some(value),
            ParamValue::List(_) => None,
        }
    }

    /// True when the value is an iterable sweep axis.
    pub fn is_iterable(&self) -> bool {
        matches!(self, ParamValue::List(_))
    }
}

impl From<Scalar> for ParamValue {
    fn from(value: Scalar) -> Self {
        ParamValue::Scalar(value)
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Scalar(value) => write!(f, "{value}"),
            ParamValue::List(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Raw experiment block: option name to scalar or sweep axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParameterSpec {
    /// Experiment block name.
    pub name: String,
    /// Options in declaration order.
    pub options: IndexMap<String, ParamValue>,
}

impl ParameterSpec {
    /// Creates an empty specification with the given block name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: IndexMap::new(),
        }
    }

    /// Builder-style insertion of an option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// True when the reserved mode key requests a single trial.
    pub fn is_single_trial(&self) -> bool {
        matches!(
            self.options.get(MODE_KEY),
            Some(ParamValue::Scalar(Scalar::Str(mode))) if mode == SINGLE_TRIAL
        )
    }

    /// Names of the options whose values are sweep axes, in declaration order.
    pub fn iterable_axes(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|(_, value)| value.is_iterable())
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// A single concrete parameter set handed to the trial simulator.
///
/// Every sweep axis has been resolved to one value, except in single-trial
/// mode where the block is passed through untouched; list-valued options are
/// then rejected by the scalar accessors below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExpandedCondition {
    /// Name of the experiment block the condition came from.
    pub name: String,
    /// Options in declaration order.
    pub options: IndexMap<String, ParamValue>,
}

impl ExpandedCondition {
    /// Wraps a specification verbatim.
    pub fn from_spec(spec: ParameterSpec) -> Self {
        Self {
            name: spec.name,
            options: spec.options,
        }
    }

    /// Returns the raw option value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.options.get(key)
    }

    /// True when the option is present.
    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Inserts or replaces an option.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.options.insert(key.into(), value.into());
    }

    /// Returns the scalar value of a required option.
    pub fn scalar(&self, key: &str) -> Result<&Scalar, NwgError> {
        match self.options.get(key) {
            Some(ParamValue::Scalar(value)) => Ok(value),
            Some(ParamValue::List(_)) => Err(NwgError::invalid_parameter(
                key,
                "expected a single value, found a list",
            )),
            None => Err(NwgError::invalid_parameter(key, "missing required option")),
        }
    }

    /// Returns a required numeric option.
    pub fn f64(&self, key: &str) -> Result<f64, NwgError> {
        self.scalar(key)?
            .as_f64()
            .ok_or_else(|| NwgError::invalid_parameter(key, "expected a number"))
    }

    /// Returns a required integral option.
    pub fn i64(&self, key: &str) -> Result<i64, NwgError> {
        self.scalar(key)?
            .as_i64()
            .ok_or_else(|| NwgError::invalid_parameter(key, "expected an integer"))
    }

    /// Returns a required non-negative integral option.
    pub fn u64(&self, key: &str) -> Result<u64, NwgError> {
        let value = self.i64(key)?;
        u64::try_from(value)
            .map_err(|_| NwgError::invalid_parameter(key, "expected a non-negative integer"))
    }

    /// Returns a required string option.
    pub fn str(&self, key: &str) -> Result<&str, NwgError> {
        self.scalar(key)?
            .as_str()
            .ok_or_else(|| NwgError::invalid_parameter(key, "expected a string"))
    }

    /// Returns a boolean option, or `default` when absent.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, NwgError> {
        if !self.contains(key) {
            return Ok(default);
        }
        self.scalar(key)?
            .as_bool()
            .ok_or_else(|| NwgError::invalid_parameter(key, "expected a boolean"))
    }

    /// Returns a string option, or `None` when absent or set to `None`.
    pub fn optional_str(&self, key: &str) -> Result<Option<&str>, NwgError> {
        match self.options.get(key) {
            None | Some(ParamValue::Scalar(Scalar::Null)) => Ok(None),
            Some(_) => self.str(key).map(Some),
        }
    }
}

impl Display for ExpandedCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.name)?;
        for (key, value) in &self.options {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}
