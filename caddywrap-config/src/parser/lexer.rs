//! Lexer for Caddyfile syntax
//!
//! Key features:
//! - Whitespace sensitive (newlines end a directive line)
//! - Directives are just Words
//! - { } for blocks
//! - "..." for quoted strings
//! - # starts a comment only at the start of a token
//! - a token runs until whitespace, so `/srv/{host}/www` is one word

use logos::{Logos, Span};
use std::fmt;

/// Source location for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
        }
    }
}

impl From<Location> for std::ops::Range<usize> {
    fn from(loc: Location) -> Self {
        loc.start..loc.end
    }
}

/// A token with its location in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Location,
    /// 1-based line the token starts on
    pub line: usize,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: impl Into<Location>, line: usize) -> Self {
        Self {
            value,
            span: span.into(),
            line,
        }
    }
}

/// Token types for Caddyfile syntax
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Skip whitespace (spaces and tabs), but NOT newlines
    #[regex(r"[ \t\f]+", logos::skip)]
    Whitespace,

    // Comments stop before the newline so it is still emitted as a terminator.
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    // ============================================================
    // Structural
    // ============================================================
    #[token("{")]
    BlockOpen,

    #[token("}")]
    BlockClose,

    #[regex(r"\r?\n")]
    Newline,

    // ============================================================
    // Values
    // ============================================================

    /// Quoted string literal: "..."
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len()-1])
    })]
    QuotedString(String),

    /// Generic Word: any run of non-whitespace. It may not start with a quote
    /// or `#`, and a lone brace is structural. Placeholders like `{host}` and
    /// `{$VAR}` stay inside the word text.
    #[regex(r##"[^ \t\r\n\f"#{}][^ \t\r\n\f]*"##, |lex| lex.slice().to_string())]
    #[regex(r"[{}][^ \t\r\n\f]+", |lex| lex.slice().to_string())]
    Word(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BlockOpen => write!(f, "{{"),
            Token::BlockClose => write!(f, "}}"),
            Token::Newline => write!(f, "\\n"),
            Token::QuotedString(s) => write!(f, "\"{}\"", s),
            Token::Word(s) => write!(f, "{}", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Unescape a string literal
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Lexer result type
pub type LexResult = Result<Vec<Spanned<Token>>, LexError>;

/// Lexer error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("line {line}: unexpected character at position {position}")]
    UnexpectedChar { position: usize, line: usize },
}

impl LexError {
    pub fn location(&self) -> Location {
        match self {
            LexError::UnexpectedChar { position, .. } => Location {
                start: *position,
                end: *position + 1,
            },
        }
    }
}

/// Tokenize a Caddyfile source string
pub fn tokenize(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut counted_to = 0;

    for (result, span) in lexer.spanned() {
        line += source[counted_to..span.start].matches('\n').count();
        counted_to = span.start;

        match result {
            Ok(Token::Whitespace) | Ok(Token::Comment) => continue,
            Ok(token) => {
                tokens.push(Spanned::new(token, span, line));
            }
            Err(_) => {
                // Only unterminated quotes can fail: Word matches everything else.
                return Err(LexError::UnexpectedChar {
                    position: span.start,
                    line,
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_basic_directive() {
        let tokens = tokenize("bind 127.0.0.1").unwrap();
        assert_eq!(tokens[0].value, Token::Word("bind".to_string()));
        assert_eq!(tokens[1].value, Token::Word("127.0.0.1".to_string()));
        assert_eq!(tokens[1].span, Location { start: 5, end: 14 });
    }

    #[test]
    fn test_block() {
        let t = values("example.com {\n  root *\n}");
        assert_eq!(
            t,
            vec![
                Token::Word("example.com".to_string()),
                Token::BlockOpen,
                Token::Newline,
                Token::Word("root".to_string()),
                Token::Word("*".to_string()),
                Token::Newline,
                Token::BlockClose,
            ]
        );
    }

    #[test]
    fn test_quotes_and_comments() {
        let source = r#"
            # This is a comment
            root "/var/www/html" # Inline comment
        "#;
        let t: Vec<Token> = values(source)
            .into_iter()
            .filter(|t| !matches!(t, Token::Newline))
            .collect();
        assert_eq!(t[0], Token::Word("root".to_string()));
        assert_eq!(t[1], Token::QuotedString("/var/www/html".to_string()));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_quoted_keeps_spaces_and_escapes() {
        let t = values(r#"k foo "a b \"c\" d e""#);
        assert_eq!(t[2], Token::QuotedString("a b \"c\" d e".to_string()));
    }

    #[test]
    fn test_env_var_and_placeholder() {
        let t = values("listen {$PORT} {host}");
        assert_eq!(t[0], Token::Word("listen".to_string()));
        assert_eq!(t[1], Token::Word("{$PORT}".to_string()));
        assert_eq!(t[2], Token::Word("{host}".to_string()));
    }

    #[test]
    fn test_word_runs_to_whitespace() {
        let t = values("root /srv/{host}/www http://{$HOST}:80 a{b}c https://x.test/a#frag");
        assert_eq!(
            t,
            vec![
                Token::Word("root".to_string()),
                Token::Word("/srv/{host}/www".to_string()),
                Token::Word("http://{$HOST}:80".to_string()),
                Token::Word("a{b}c".to_string()),
                Token::Word("https://x.test/a#frag".to_string()),
            ]
        );
    }

    #[test]
    fn test_lone_braces_are_structural() {
        let t = values("site {
  {host}/x }
}} #c");
        assert_eq!(
            t,
            vec![
                Token::Word("site".to_string()),
                Token::BlockOpen,
                Token::Newline,
                Token::Word("{host}/x".to_string()),
                Token::BlockClose,
                Token::Newline,
                Token::Word("}}".to_string()),
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a 1\n\nb \"x\ny\"\nc").unwrap();
        let lines: Vec<(String, usize)> = tokens
            .iter()
            .filter(|t| !matches!(t.value, Token::Newline))
            .map(|t| (t.value.to_string(), t.line))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("a".to_string(), 1),
                ("1".to_string(), 1),
                ("b".to_string(), 3),
                ("\"x\ny\"".to_string(), 3),
                ("c".to_string(), 5),
            ]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize("a\nb \"oops").unwrap_err();
        assert_eq!(err, LexError::UnexpectedChar { position: 4, line: 2 });
    }
}
