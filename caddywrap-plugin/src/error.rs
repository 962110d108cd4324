//! Setup errors

use caddywrap_config::{Location, UnmarshalError};
use thiserror::Error;

/// Why a directive could not be set up. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{0}")]
    Unmarshal(#[from] UnmarshalError),

    #[error("line {line}: unknown directive '{name}'")]
    UnknownDirective {
        name: String,
        line: usize,
        span: Location,
    },

    #[error("line {line}: invalid site address '{address}': {reason}")]
    Address {
        address: String,
        reason: String,
        line: usize,
        span: Location,
    },

    #[error("{directive}: {message}")]
    Invalid { directive: String, message: String },

    #[error("Failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] caddywrap_core::Error),
}

impl SetupError {
    /// Source location the error points at, if it has one
    pub fn location(&self) -> Option<Location> {
        match self {
            SetupError::Unmarshal(e) => e.location(),
            SetupError::UnknownDirective { span, .. } | SetupError::Address { span, .. } => {
                Some(*span)
            }
            SetupError::Invalid { .. } | SetupError::Encode(_) | SetupError::Core(_) => None,
        }
    }
}
