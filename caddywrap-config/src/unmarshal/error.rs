use crate::parser::{LexError, Location};
use crate::unmarshal::FieldKind;
use thiserror::Error;

/// Unmarshal error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnmarshalError {
    #[error("line {line}: cannot use '{token}' as {expected} for `{field}`: {reason}")]
    Parse {
        field: &'static str,
        token: String,
        expected: FieldKind,
        reason: String,
        line: usize,
        span: Location,
    },

    #[error("line {line}: '{keyword}' needs {needed} value(s) for `{field}`, found {found}")]
    MissingValue {
        field: &'static str,
        keyword: String,
        needed: usize,
        found: usize,
        line: usize,
        span: Location,
    },

    #[error("line {line}: unknown subdirective '{keyword}'")]
    UnknownDirective {
        keyword: String,
        line: usize,
        span: Location,
    },

    #[error("invalid binding for field `{field}`: {message}")]
    Schema { field: &'static str, message: String },

    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),
}

impl UnmarshalError {
    /// Source location the error points at; schema errors have none
    pub fn location(&self) -> Option<Location> {
        match self {
            UnmarshalError::Parse { span, .. }
            | UnmarshalError::MissingValue { span, .. }
            | UnmarshalError::UnknownDirective { span, .. } => Some(*span),
            UnmarshalError::Lex(e) => Some(e.location()),
            UnmarshalError::Schema { .. } => None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            UnmarshalError::Parse { line, .. }
            | UnmarshalError::MissingValue { line, .. }
            | UnmarshalError::UnknownDirective { line, .. } => Some(*line),
            UnmarshalError::Lex(LexError::UnexpectedChar { line, .. }) => Some(*line),
            UnmarshalError::Schema { .. } => None,
        }
    }
}
