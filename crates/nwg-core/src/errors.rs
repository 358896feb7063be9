//! Structured error types shared across NWG crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`NwgError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (option names, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the experiment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum NwgError {
    /// Configuration file errors (missing, unreadable, malformed).
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Invalid or missing experiment parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(ErrorInfo),
    /// A configured mode exists in the vocabulary but has no implementation.
    #[error("unimplemented: {0}")]
    Unimplemented(ErrorInfo),
    /// Stimulus data errors.
    #[error("stimuli error: {0}")]
    Stimuli(ErrorInfo),
    /// Numeric failures such as a zero denominator under a strict policy.
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// Filesystem errors while persisting artefacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl NwgError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            NwgError::Config(info)
            | NwgError::InvalidParameter(info)
            | NwgError::Unimplemented(info)
            | NwgError::Stimuli(info)
            | NwgError::Numeric(info)
            | NwgError::Io(info)
            | NwgError::Serde(info) => info,
        }
    }

    /// Shorthand for an [`NwgError::InvalidParameter`] naming the offending option.
    pub fn invalid_parameter(key: &str, message: impl Into<String>) -> Self {
        NwgError::InvalidParameter(
            ErrorInfo::new("invalid-parameter", message).with_context("key", key),
        )
    }
}
