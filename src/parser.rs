// src/parser.rs
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidSyntax { message: String, offset: usize },
}

/// Character cursor over script text. Knows about literals, identifiers,
/// whitespace and comments; the grammar itself lives in `expression`.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
    /// Open `(`/`[`/`${` depth. Newlines only end a statement at depth zero.
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0, nesting: 0 }
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::InvalidSyntax {
            message: message.into(),
            offset: self.i,
        }
    }

    pub fn mark(&self) -> (usize, usize) {
        (self.i, self.nesting)
    }

    pub fn reset(&mut self, (i, nesting): (usize, usize)) {
        self.i = i;
        self.nesting = nesting;
    }

    pub fn open(&mut self) {
        self.nesting += 1;
    }

    pub fn close(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    pub fn nested(&self) -> bool {
        self.nesting > 0
    }

    pub fn is_ident_start(c: char) -> bool {
        c == '_' || c.is_ascii_alphabetic()
    }

    pub fn is_ident_continue(c: char) -> bool {
        c == '_' || c.is_ascii_alphanumeric()
    }

    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        match self.peek_char() {
            Some(c) if Self::is_ident_start(c) => self.i += c.len_utf8(),
            _ => return Err(self.error("identifier expected")),
        }
        while let Some(c) = self.peek_char() {
            if Self::is_ident_continue(c) {
                self.i += 1;
            } else {
                break;
            }
        }
        Ok(self.s[start..self.i].to_string())
    }

    /// Reads an unsigned integer or decimal literal. Sign is handled by the
    /// unary minus operator.
    pub fn parse_number_literal(&mut self) -> Result<Value, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        // `1.5` is a decimal, `list.1` never happens, `1.abs()` is a call on 1
        if self.peek_char() == Some('.')
            && self.s[self.i + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        {
            self.i += 1;
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    self.i += 1;
                } else {
                    break;
                }
            }
        }
        let s = &self.s[start..self.i];
        if s.is_empty() {
            return Err(self.error("number expected"));
        }
        if s.contains('.') {
            let f: f64 = s.parse().map_err(|_| self.error("bad decimal"))?;
            Ok(Value::from(f))
        } else {
            let i: i64 = s.parse().map_err(|_| self.error("integer out of range"))?;
            Ok(Value::from(i))
        }
    }

    /// Single-quoted string: no interpolation, backslash escapes only.
    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        self.expect('\'')?;
        let mut out = String::new();
        while let Some(c) = self.next_char() {
            if c == '\'' {
                return Ok(out);
            }
            if c == '\\' {
                out.push(self.parse_escape()?);
            } else {
                out.push(c);
            }
        }
        Err(self.error("unterminated string"))
    }

    /// Decodes the character after a backslash. The backslash is already consumed.
    pub fn parse_escape(&mut self) -> Result<char, ParseError> {
        match self.next_char() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some(c @ ('\\' | '"' | '\'' | '$')) => Ok(c),
            Some(c) => Err(self.error(format!("unknown escape '\\{c}'"))),
            None => Err(self.error("unterminated string")),
        }
    }

    pub fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    /// Consumes a keyword only when it is not the prefix of a longer identifier.
    pub fn consume_keyword(&mut self, kw: &str) -> bool {
        if !self.peek_str(kw) {
            return false;
        }
        let after = self.s[self.i + kw.len()..].chars().next();
        if after.is_some_and(Self::is_ident_continue) {
            return false;
        }
        self.i += kw.len();
        true
    }

    pub fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.i += c.len_utf8();
        Some(c)
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_second(&self) -> Option<char> {
        self.s[self.i..].chars().nth(1)
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    /// Skips blanks and comments. Newlines are skipped only inside brackets.
    pub fn skip_inline_ws(&mut self) {
        loop {
            match self.peek_char() {
                Some('\n') if !self.nested() => break,
                Some(c) if c.is_whitespace() => self.i += c.len_utf8(),
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.i += c.len_utf8();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    self.i += 2;
                    match self.s[self.i..].find("*/") {
                        Some(end) => self.i += end + 2,
                        None => self.i = self.s.len(),
                    }
                }
                _ => break,
            }
        }
    }

    /// Skips blanks, comments and newlines.
    pub fn skip_ws(&mut self) {
        loop {
            self.skip_inline_ws();
            if !self.consume_char('\n') {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}
