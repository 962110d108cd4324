//! Token dispenser
//!
//! A cursor over the tokens of one or more directives. Directive setup code
//! walks it line by line: [`Dispenser::next`] moves to a directive name,
//! [`Dispenser::next_arg`] reads arguments on the same line and
//! [`Dispenser::next_block`] enters and walks the block opened by a line.

use crate::parser::lexer::{self, LexError, Location};

/// Kind of a dispensed token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Quoted,
    BlockOpen,
    BlockClose,
}

/// A single Caddyfile token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    /// Line the token starts on (1-based)
    pub line: usize,
    /// Line the token ends on; differs from `line` for multi-line quoted strings
    pub last_line: usize,
    pub span: Location,
}

impl Token {
    /// Create a word token, mostly useful in tests
    pub fn word(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            kind: TokenKind::Word,
            line,
            last_line: line,
            span: Location::default(),
        }
    }

    pub fn is_block_open(&self) -> bool {
        self.kind == TokenKind::BlockOpen
    }

    pub fn is_block_close(&self) -> bool {
        self.kind == TokenKind::BlockClose
    }

    fn is_structural(&self) -> bool {
        self.is_block_open() || self.is_block_close()
    }
}

/// Lex `source` into dispenser tokens, replacing `{$VAR}` inside unquoted
/// words through `env`. Unset variables expand to nothing.
pub fn lex_tokens<F>(source: &str, env: F) -> Result<Vec<Token>, LexError>
where
    F: Fn(&str) -> Option<String>,
{
    let spanned = lexer::tokenize(source)?;
    let mut tokens = Vec::with_capacity(spanned.len());

    for token in spanned {
        let (text, kind) = match token.value {
            lexer::Token::Newline => continue,
            lexer::Token::BlockOpen => ("{".to_string(), TokenKind::BlockOpen),
            lexer::Token::BlockClose => ("}".to_string(), TokenKind::BlockClose),
            lexer::Token::QuotedString(s) => (s, TokenKind::Quoted),
            lexer::Token::Word(s) => (expand_env(&s, &env), TokenKind::Word),
            lexer::Token::Whitespace | lexer::Token::Comment => continue,
        };
        let raw = &source[token.span.start..token.span.end];
        tokens.push(Token {
            text,
            kind,
            line: token.line,
            last_line: token.line + raw.matches('\n').count(),
            span: token.span,
        });
    }

    Ok(tokens)
}

fn expand_env<F>(word: &str, env: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(word.len());
    let mut rest = word;

    while let Some(start) = rest.find("{$") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if is_env_name(&after[..end]) => {
                out.push_str(&rest[..start]);
                out.push_str(&env(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str(&rest[..start + 2]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Process environment lookup used by [`Dispenser::new`]
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Cursor over Caddyfile tokens
#[derive(Debug, Clone)]
pub struct Dispenser {
    file: String,
    tokens: Vec<Token>,
    cursor: Option<usize>,
    nesting: usize,
}

impl Dispenser {
    /// Lex `source` with the process environment
    pub fn new(file: impl Into<String>, source: &str) -> Result<Self, LexError> {
        Self::with_env(file, source, process_env)
    }

    /// Lex `source` with a custom environment lookup
    pub fn with_env<F>(file: impl Into<String>, source: &str, env: F) -> Result<Self, LexError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self::from_tokens(file, lex_tokens(source, env)?))
    }

    pub fn from_tokens(file: impl Into<String>, tokens: Vec<Token>) -> Self {
        Self {
            file: file.into(),
            tokens,
            cursor: None,
            nesting: 0,
        }
    }

    /// Name of the file the tokens came from
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Rewind to before the first token
    pub fn reset(&mut self) {
        self.cursor = None;
        self.nesting = 0;
    }

    /// Current token, `None` before the first call to [`next`](Self::next)
    pub fn token(&self) -> Option<&Token> {
        self.cursor.and_then(|c| self.tokens.get(c))
    }

    /// Text of the current token, empty when there is none
    pub fn val(&self) -> &str {
        self.token().map_or("", |t| t.text.as_str())
    }

    /// Line of the current token, 0 when there is none
    pub fn line(&self) -> usize {
        self.token().map_or(0, |t| t.line)
    }

    /// Number of blocks currently entered
    pub fn nesting(&self) -> usize {
        self.nesting
    }

    fn peek(&self) -> Option<&Token> {
        let next = self.cursor.map_or(0, |c| c + 1);
        self.tokens.get(next)
    }

    /// Whether the next token continues the current line
    fn next_on_same_line(&self) -> bool {
        match (self.token(), self.peek()) {
            (Some(current), Some(next)) => current.last_line == next.line,
            _ => false,
        }
    }

    /// Move to the next token, whatever line it is on
    pub fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.tokens.len() {
            self.cursor = Some(next);
            true
        } else {
            false
        }
    }

    /// Move to the next argument on the current line. Braces are never
    /// arguments; quoted braces are.
    pub fn next_arg(&mut self) -> bool {
        if !self.next_on_same_line() {
            return false;
        }
        match self.peek() {
            Some(next) if !next.is_structural() => self.next(),
            _ => false,
        }
    }

    /// Move to the next token only if it starts a new line
    pub fn next_line(&mut self) -> bool {
        if self.cursor.is_none() {
            return self.next();
        }
        if self.next_on_same_line() {
            return false;
        }
        self.next()
    }

    /// Enter the block opened at the end of the current line, or advance to
    /// the first token of the next line inside it. `depth` is the nesting
    /// level of the line that owns the block: 0 for a directive, 1 for a line
    /// directly inside the directive's block, and so on.
    ///
    /// Returns false when there is no block or its closing brace is reached.
    pub fn next_block(&mut self, depth: usize) -> bool {
        if self.nesting > depth {
            self.skip_rest_of_line();
            if !self.next() {
                return false;
            }
            if self.token().is_some_and(Token::is_block_close) {
                self.nesting -= 1;
                return false;
            }
            return true;
        }

        let opens = self.next_on_same_line() && self.peek().is_some_and(Token::is_block_open);
        if !opens {
            return false;
        }
        self.next();
        self.nesting += 1;
        if !self.next() {
            return false;
        }
        if self.token().is_some_and(Token::is_block_close) {
            // opened and closed right away
            self.nesting -= 1;
            return false;
        }
        true
    }

    /// Skip a block opened on the current line without entering it.
    /// Returns whether a block was skipped.
    pub fn skip_block(&mut self) -> bool {
        let opens = self.next_on_same_line() && self.peek().is_some_and(Token::is_block_open);
        if !opens {
            return false;
        }
        self.next();
        let mut depth = 1;
        while depth > 0 && self.next() {
            match self.token().map(|t| t.kind) {
                Some(TokenKind::BlockOpen) => depth += 1,
                Some(TokenKind::BlockClose) => depth -= 1,
                _ => {}
            }
        }
        true
    }

    /// Consume whatever the caller left on the current line, including an
    /// unentered sub-block, stopping before a closing brace.
    fn skip_rest_of_line(&mut self) {
        while self.next_on_same_line() {
            match self.peek().map(|t| t.kind) {
                Some(TokenKind::BlockClose) => break,
                Some(TokenKind::BlockOpen) => {
                    self.skip_block();
                }
                _ => {
                    self.next();
                }
            }
        }
    }

    /// All remaining arguments on the current line
    pub fn remaining_args(&mut self) -> Vec<String> {
        let mut args = Vec::new();
        while self.next_arg() {
            args.push(self.val().to_string());
        }
        args
    }

    /// All remaining arguments on the current line, as tokens
    pub fn remaining_arg_tokens(&mut self) -> Vec<Token> {
        let mut args = Vec::new();
        while self.next_arg() {
            if let Some(token) = self.token() {
                args.push(token.clone());
            }
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispenser(source: &str) -> Dispenser {
        Dispenser::with_env("Testfile", source, |_| None).unwrap()
    }

    #[test]
    fn test_next_and_args() {
        let mut d = dispenser("dir a b\nother c");
        assert!(d.next());
        assert_eq!(d.val(), "dir");
        assert_eq!(d.remaining_args(), vec!["a", "b"]);
        assert!(!d.next_arg());
        assert!(d.next_line());
        assert_eq!(d.val(), "other");
        assert!(d.next_arg());
        assert_eq!(d.val(), "c");
        assert!(!d.next());
    }

    #[test]
    fn test_next_line_refuses_same_line() {
        let mut d = dispenser("a b\nc");
        assert!(d.next_line());
        assert!(!d.next_line());
        assert!(d.next_arg());
        assert!(d.next_line());
        assert_eq!(d.val(), "c");
        assert_eq!(d.line(), 2);
    }

    #[test]
    fn test_block_walk() {
        let mut d = dispenser("dir arg {\n  one 1\n  two\n}\ndir");
        assert!(d.next());
        assert_eq!(d.remaining_args(), vec!["arg"]);

        let mut lines = Vec::new();
        while d.next_block(0) {
            let key = d.val().to_string();
            lines.push((key, d.remaining_args()));
        }
        assert_eq!(
            lines,
            vec![
                ("one".to_string(), vec!["1".to_string()]),
                ("two".to_string(), vec![]),
            ]
        );
        assert_eq!(d.nesting(), 0);

        assert!(d.next());
        assert_eq!(d.val(), "dir");
        assert!(!d.next_block(0));
    }

    #[test]
    fn test_empty_block() {
        let mut d = dispenser("dir {\n}\nnext");
        assert!(d.next());
        assert!(!d.next_block(0));
        assert_eq!(d.nesting(), 0);
        assert!(d.next());
        assert_eq!(d.val(), "next");
    }

    #[test]
    fn test_block_must_open_on_same_line() {
        let mut d = dispenser("dir\n{\n a\n}");
        assert!(d.next());
        assert!(!d.next_block(0));
    }

    #[test]
    fn test_descend_into_sub_block() {
        let mut d = dispenser("dir {\n  outer x {\n    inner y\n  }\n  last\n}");
        assert!(d.next());
        let mut seen = Vec::new();
        while d.next_block(0) {
            seen.push(d.val().to_string());
            d.remaining_args();
            while d.next_block(1) {
                seen.push(format!("{}@{}", d.val(), d.nesting()));
            }
        }
        assert_eq!(seen, vec!["outer", "inner@2", "last"]);
        assert_eq!(d.nesting(), 0);
    }

    #[test]
    fn test_unentered_sub_block_is_skipped() {
        let mut d = dispenser("dir {\n  outer {\n    inner y\n  }\n  last z\n}");
        assert!(d.next());
        let mut seen = Vec::new();
        while d.next_block(0) {
            seen.push(d.val().to_string());
        }
        assert_eq!(seen, vec!["outer", "last"]);
    }

    #[test]
    fn test_braces_are_not_args() {
        let mut d = dispenser("dir a \"{\" {\n}");
        assert!(d.next());
        assert_eq!(d.remaining_args(), vec!["a", "{"]);
        assert!(!d.next_block(0));
    }

    #[test]
    fn test_env_expansion() {
        let mut d = Dispenser::with_env("Testfile", "listen {$PORT} {$MISSING}", |name| {
            (name == "PORT").then(|| "8080".to_string())
        })
        .unwrap();
        assert!(d.next());
        let args = d.remaining_arg_tokens();
        assert_eq!(args[0].text, "8080");
        assert_eq!(args[1].text, "");
    }

    #[test]
    fn test_env_expansion_inside_word() {
        let source = "app http://{$HOST}:80 /srv/{host}/www {$ODD x{$}y \"{$HOST}\"";
        let mut d = Dispenser::with_env("Testfile", source, |name| {
            (name == "HOST").then(|| "example.com".to_string())
        })
        .unwrap();
        assert!(d.next());
        assert_eq!(
            d.remaining_args(),
            vec!["http://example.com:80", "/srv/{host}/www", "{$ODD", "x{$}y", "{$HOST}"]
        );
    }

    #[test]
    fn test_mid_word_brace_and_hash() {
        let mut d = dispenser("app a{b https://x.test/a#frag # trailing\nnext");
        assert!(d.next());
        assert_eq!(d.remaining_args(), vec!["a{b", "https://x.test/a#frag"]);
        assert!(d.next());
        assert_eq!(d.val(), "next");
    }

    #[test]
    fn test_reset() {
        let mut d = dispenser("a b");
        while d.next() {}
        d.reset();
        assert!(d.token().is_none());
        assert!(d.next());
        assert_eq!(d.val(), "a");
    }
}
