//! Parser module for Caddyfiles
//!
//! This module provides the lexer, the token dispenser directive setup code
//! walks, and the server-block parser that groups tokens per directive.

pub mod caddyfile;
pub mod dispenser;
pub mod lexer;

pub use caddyfile::{DirectiveTokens, ParseError, Parser, ServerBlock, parse, parse_with_env};
pub use dispenser::{Dispenser, Token, TokenKind, lex_tokens, process_env};
pub use lexer::{LexError, Location, Spanned, tokenize};
