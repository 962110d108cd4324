//! Assignment engine
//!
//! Walks every occurrence of a directive:
//!
//! ```text
//! TopLevel --name--> PositionalArgs --'{'--> NestedBlock --'}'--> TopLevel
//!     |                    |                                        ^
//!     |                    +-------------- end of line -------------+
//!     +--end of input--> Done
//! ```

use crate::parser::{Dispenser, Token};
use crate::unmarshal::schema::{FieldIndex, IndexedField};
use crate::unmarshal::{UnknownDirectives, UnmarshalError, UnmarshalOptions, ValueError};
use std::slice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    TopLevel,
    PositionalArgs { position: usize },
    NestedBlock,
    Done,
}

/// Fill `target` from the dispenser's remaining directive occurrences
pub(crate) fn run<T: 'static>(
    d: &mut Dispenser,
    target: &mut T,
    index: &FieldIndex<T>,
    options: &UnmarshalOptions,
) -> Result<(), UnmarshalError> {
    let depth = d.nesting();
    let mut state = State::TopLevel;

    loop {
        state = match state {
            State::TopLevel => {
                if d.next() {
                    tracing::trace!("Unmarshaling '{}' on line {}", d.val(), d.line());
                    State::PositionalArgs { position: 0 }
                } else {
                    State::Done
                }
            }
            State::PositionalArgs { position } => {
                if d.next_arg() {
                    if let Some(token) = d.token() {
                        assign_positional(target, index, position, token)?;
                    }
                    State::PositionalArgs {
                        position: position + 1,
                    }
                } else if d.next_block(depth) {
                    assign_line(d, target, index, options)?;
                    State::NestedBlock
                } else {
                    State::TopLevel
                }
            }
            State::NestedBlock => {
                if d.next_block(depth) {
                    assign_line(d, target, index, options)?;
                    State::NestedBlock
                } else {
                    State::TopLevel
                }
            }
            State::Done => return Ok(()),
        };
    }
}

fn assign_positional<T>(
    target: &mut T,
    index: &FieldIndex<T>,
    position: usize,
    token: &Token,
) -> Result<(), UnmarshalError>
where
    T: 'static,
{
    match index.by_position(position) {
        Some(field) => (field.assign)(target, slice::from_ref(token))
            .map_err(|e| field_error(field, token, e)),
        None => {
            tracing::debug!(
                "Ignoring argument {} ('{}') on line {}",
                position,
                token.text,
                token.line
            );
            Ok(())
        }
    }
}

/// Assign one nested line. The dispenser is on the line's keyword.
fn assign_line<T: 'static>(
    d: &mut Dispenser,
    target: &mut T,
    index: &FieldIndex<T>,
    options: &UnmarshalOptions,
) -> Result<(), UnmarshalError> {
    let Some(keyword) = d.token().cloned() else {
        return Ok(());
    };
    let args = d.remaining_arg_tokens();
    if d.skip_block() {
        tracing::debug!(
            "Skipping block opened by '{}' on line {}",
            keyword.text,
            keyword.line
        );
    }

    match index.by_keyword(&keyword.text.to_lowercase()) {
        Some(field) => {
            (field.assign)(target, &args).map_err(|e| field_error(field, &keyword, e))
        }
        None => match options.unknown {
            UnknownDirectives::Ignore => {
                tracing::debug!(
                    "Ignoring unknown subdirective '{}' on line {}",
                    keyword.text,
                    keyword.line
                );
                Ok(())
            }
            UnknownDirectives::Reject => Err(UnmarshalError::UnknownDirective {
                keyword: keyword.text,
                line: keyword.line,
                span: keyword.span,
            }),
        },
    }
}

/// `at` is the token a missing value is reported against
fn field_error<T>(field: &IndexedField<T>, at: &Token, error: ValueError) -> UnmarshalError {
    match error {
        ValueError::Invalid {
            token,
            expected,
            reason,
        } => UnmarshalError::Parse {
            field: field.binding.ident,
            token: token.text,
            expected,
            reason,
            line: token.line,
            span: token.span,
        },
        ValueError::Missing { needed, found } => UnmarshalError::MissingValue {
            field: field.binding.ident,
            keyword: at.text.clone(),
            needed,
            found,
            line: at.line,
            span: at.span,
        },
    }
}
