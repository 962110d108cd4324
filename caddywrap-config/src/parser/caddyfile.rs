//! Caddyfile server blocks
//!
//! A Caddyfile is a list of server blocks:
//!
//! ```text
//! example.com, www.example.com {
//!     directive arg
//!     directive {
//!         sub value
//!     }
//! }
//! ```
//!
//! A file holding a single site may leave out the braces. The parser does not
//! interpret directives; it groups the tokens of every occurrence of a
//! directive under its name so each directive's setup gets one dispenser.

use crate::parser::dispenser::{Dispenser, Token, lex_tokens, process_env};
use crate::parser::lexer::{LexError, Location};
use thiserror::Error;

/// Parser error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),

    #[error("line {line}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        line: usize,
        span: Location,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, span: Location },
}

impl ParseError {
    /// Source location the error points at
    pub fn location(&self) -> Location {
        match self {
            ParseError::Lex(e) => e.location(),
            ParseError::UnexpectedToken { span, .. } | ParseError::UnexpectedEof { span, .. } => {
                *span
            }
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// All tokens of one directive within a server block
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveTokens {
    pub name: String,
    /// Every occurrence, name token included, in source order
    pub tokens: Vec<Token>,
}

/// One site definition
#[derive(Debug, Clone, PartialEq)]
pub struct ServerBlock {
    pub addresses: Vec<Token>,
    /// Directives in order of first appearance
    pub directives: Vec<DirectiveTokens>,
}

impl ServerBlock {
    pub fn address_names(&self) -> Vec<&str> {
        self.addresses.iter().map(|t| t.text.as_str()).collect()
    }

    pub fn directive(&self, name: &str) -> Option<&DirectiveTokens> {
        self.directives.iter().find(|d| d.name == name)
    }

    /// Dispenser over every occurrence of `name` in this block
    pub fn dispenser(&self, file: &str, name: &str) -> Option<Dispenser> {
        self.directive(name)
            .map(|d| Dispenser::from_tokens(file, d.tokens.clone()))
    }

    fn push_occurrence(&mut self, tokens: Vec<Token>) {
        let name = match tokens.first() {
            Some(t) => t.text.clone(),
            None => return,
        };
        match self.directives.iter_mut().find(|d| d.name == name) {
            Some(existing) => existing.tokens.extend(tokens),
            None => self.directives.push(DirectiveTokens { name, tokens }),
        }
    }
}

/// Parse a Caddyfile, expanding `{$VAR}` from the process environment
pub fn parse(source: &str) -> ParseResult<Vec<ServerBlock>> {
    parse_with_env(source, process_env)
}

/// Parse a Caddyfile with a custom environment lookup
pub fn parse_with_env<F>(source: &str, env: F) -> ParseResult<Vec<ServerBlock>>
where
    F: Fn(&str) -> Option<String>,
{
    Parser::new(lex_tokens(source, env)?).parse()
}

/// Server block parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the entire token stream
    pub fn parse(&mut self) -> ParseResult<Vec<ServerBlock>> {
        let mut blocks = Vec::new();
        while !self.is_eof() {
            let block = self.parse_server_block(blocks.is_empty())?;
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn parse_server_block(&mut self, first: bool) -> ParseResult<ServerBlock> {
        let mut block = ServerBlock {
            addresses: self.parse_addresses()?,
            directives: Vec::new(),
        };

        if self.opens_block_on_line() {
            self.advance();
            self.parse_directives(&mut block, true)?;
        } else if first {
            // braceless single-site file: everything else belongs to it
            self.parse_directives(&mut block, false)?;
        } else {
            return Err(self.unexpected("'{' after site addresses"));
        }

        Ok(block)
    }

    fn parse_addresses(&mut self) -> ParseResult<Vec<Token>> {
        let mut addresses = Vec::new();

        loop {
            let token = match self.peek() {
                Some(t) if !t.is_block_open() && !t.is_block_close() => t.clone(),
                Some(_) => return Err(self.unexpected("site address")),
                None => return Err(self.eof("site address")),
            };
            self.advance();

            let continued = token.text.ends_with(',');
            let name = token.text.trim_end_matches(',');
            if !name.is_empty() {
                addresses.push(Token {
                    text: name.to_string(),
                    ..token.clone()
                });
            }

            let more_on_line = self
                .peek()
                .is_some_and(|next| next.line == token.last_line && !next.is_block_open());
            let next_is_address = self.peek().is_some_and(|next| !next.is_block_open() && !next.is_block_close());

            if !(continued && next_is_address || more_on_line) {
                break;
            }
        }

        if addresses.is_empty() {
            return Err(self.unexpected("site address"));
        }
        Ok(addresses)
    }

    fn parse_directives(&mut self, block: &mut ServerBlock, braced: bool) -> ParseResult<()> {
        loop {
            let token = match self.peek() {
                Some(t) => t.clone(),
                None if braced => return Err(self.eof("'}'")),
                None => return Ok(()),
            };

            if token.is_block_close() {
                if braced {
                    self.advance();
                    return Ok(());
                }
                return Err(self.unexpected("directive"));
            }
            if token.is_block_open() {
                return Err(self.unexpected("directive"));
            }

            let occurrence = self.parse_directive_tokens()?;
            block.push_occurrence(occurrence);
        }
    }

    /// Tokens of one directive occurrence: its line plus any block it opens
    fn parse_directive_tokens(&mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;

        while let Some(token) = self.peek().cloned() {
            let same_line = tokens
                .last()
                .is_some_and(|prev: &Token| prev.last_line == token.line);

            if depth == 0 && !tokens.is_empty() && !same_line {
                break;
            }
            if depth == 0 && token.is_block_close() {
                // closes the enclosing server block
                break;
            }

            if token.is_block_open() {
                depth += 1;
            } else if token.is_block_close() {
                depth -= 1;
            }
            tokens.push(token);
            self.advance();

            if depth == 0 && tokens.last().is_some_and(Token::is_block_close) {
                break;
            }
        }

        if depth > 0 {
            return Err(self.eof("'}'"));
        }
        Ok(tokens)
    }

    fn opens_block_on_line(&self) -> bool {
        match (self.previous(), self.peek()) {
            (Some(prev), Some(next)) => next.is_block_open() && prev.last_line == next.line,
            _ => false,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|p| self.tokens.get(p))
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(t) => ParseError::UnexpectedToken {
                line: t.line,
                span: t.span,
                expected: expected.to_string(),
                found: t.text.clone(),
            },
            None => self.eof(expected),
        }
    }

    fn eof(&self, expected: &str) -> ParseError {
        let end = self.tokens.last().map_or(0, |t| t.span.end);
        ParseError::UnexpectedEof {
            expected: expected.to_string(),
            span: Location { start: end, end },
        }
    }
}
