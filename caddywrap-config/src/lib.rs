//! Caddywrap Configuration
//!
//! This crate lexes Caddyfiles, hands out per-directive token dispensers and
//! fills configuration structs from a directive's tokens.
//!
//! # Example
//!
//! ```rust
//! use caddywrap_config::{directive_fields, parser::Dispenser, unmarshal};
//!
//! #[derive(Debug, Default)]
//! struct Limits {
//!     path: String,
//!     max: u32,
//!     strict: bool,
//! }
//!
//! directive_fields!(Limits {
//!     path => ",arg0",
//!     max,
//!     strict,
//! });
//!
//! let mut d = Dispenser::with_env("Caddyfile", "limits /api {\n max 10\n strict\n}", |_| None).unwrap();
//! let mut limits = Limits::default();
//! unmarshal::unmarshal(&mut d, &mut limits).unwrap();
//!
//! assert_eq!(limits.path, "/api");
//! assert_eq!(limits.max, 10);
//! assert!(limits.strict);
//! ```

pub mod parser;
pub mod report;
pub mod unmarshal;

pub use parser::{
    Dispenser, LexError, Location, ParseError, ServerBlock, Token, TokenKind, parse,
    parse_with_env, tokenize,
};
pub use report::render;
pub use unmarshal::{
    FieldBinding, SchemaBuilder, Unmarshal, UnmarshalError, UnmarshalOptions, UnknownDirectives,
    from_str, schema_of, unmarshal, unmarshal_with,
};
