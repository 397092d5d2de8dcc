use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// Failures reported by the command parser engine.
///
/// These travel unchanged inside a rejected envelope; the adapter never
/// wraps or rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Fewer positional arguments than a command (or `demand_command`) needs.
    #[error("Not enough non-option arguments: got {got}, need at least {need}")]
    NotEnoughArguments { got: usize, need: usize },

    /// First positional is not a registered command while strict commands are on.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The request string could not be tokenized.
    #[error("Invalid command line: {0}")]
    Syntax(String),

    /// A usage string passed at registration is malformed.
    #[error("Invalid command usage `{usage}`: {reason}")]
    InvalidUsage { usage: String, reason: String },
}

impl EngineError {
    /// Stable tag for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotEnoughArguments { .. } => "not_enough_arguments",
            EngineError::UnknownCommand(_) => "unknown_command",
            EngineError::Syntax(_) => "syntax",
            EngineError::InvalidUsage { .. } => "invalid_usage",
        }
    }

    pub(crate) fn invalid_usage(usage: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidUsage {
            usage: usage.to_string(),
            reason: reason.into(),
        }
    }
}

impl Serialize for EngineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("kind", self.kind())?;
        map.serialize_entry("message", &self.to_string())?;
        map.end()
    }
}

// Type alias for results that use `EngineError` as the error type
pub type Result<T> = std::result::Result<T, EngineError>;
