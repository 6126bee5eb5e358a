//! Token reader for the field serialization formats.

use bytes::{Buf, Bytes};

use crate::error::FieldError;

#[derive(Debug)]
enum Source {
    Text(String),
    Binary(Bytes),
}

/// In-memory input stream, either text or binary.
///
/// Text mode skips whitespace and `#` comments between tokens and supports
/// putting back the last character read. Binary mode mirrors
/// [`Output::binary`](super::Output::binary).
#[derive(Debug)]
pub struct Input {
    source: Source,
    pos: usize,
    line: usize,
}

impl Input {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            source: Source::Text(text.into()),
            pos: 0,
            line: 1,
        }
    }

    pub fn from_binary(data: impl Into<Bytes>) -> Self {
        Self {
            source: Source::Binary(data.into()),
            pos: 0,
            line: 1,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.source, Source::Binary(_))
    }

    /// Current line number (always 1 for binary input).
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn error(&self, message: impl Into<String>) -> FieldError {
        FieldError::parse(self.line, message)
    }

    fn premature_eof(&self) -> FieldError {
        self.error("premature end of input")
    }

    /// True when only whitespace and comments remain.
    pub fn eof(&mut self) -> bool {
        self.skip_whitespace();
        match &self.source {
            Source::Text(text) => self.pos >= text.len(),
            Source::Binary(data) => self.pos >= data.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        let Source::Text(text) = &self.source else {
            return;
        };
        let bytes = text.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'#' => {
                    while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// Next significant character without consuming it.
    pub fn peek_char(&mut self) -> Option<char> {
        self.skip_whitespace();
        match &self.source {
            Source::Text(text) => text[self.pos..].chars().next(),
            Source::Binary(data) => data.get(self.pos).map(|b| *b as char),
        }
    }

    pub fn read_char(&mut self) -> Result<char, FieldError> {
        let c = self.peek_char().ok_or_else(|| self.premature_eof())?;
        self.pos += match self.source {
            Source::Text(_) => c.len_utf8(),
            Source::Binary(_) => 1,
        };
        Ok(c)
    }

    /// Un-reads `c`, which must be the character last returned by `read_char`.
    pub fn put_back(&mut self, c: char) {
        let len = match self.source {
            Source::Text(_) => c.len_utf8(),
            Source::Binary(_) => 1,
        };
        assert!(self.pos >= len, "put_back past the start of the input");
        self.pos -= len;
    }

    fn read_token(&mut self, accept: impl Fn(char) -> bool) -> String {
        self.skip_whitespace();
        let Source::Text(text) = &self.source else {
            return String::new();
        };
        let token: String = text[self.pos..].chars().take_while(|c| accept(*c)).collect();
        self.pos += token.len();
        token
    }

    fn unexpected(&mut self, expected: &str) -> FieldError {
        match self.peek_char() {
            Some(c) => self.error(format!("expected {expected}, got '{c}'")),
            None => self.premature_eof(),
        }
    }

    pub fn read_name(&mut self) -> Result<String, FieldError> {
        if self.is_binary() {
            return self.read_padded_string();
        }
        match self.peek_char() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return Err(self.unexpected("a name")),
        }
        Ok(self.read_token(|c| c.is_alphanumeric() || c == '_'))
    }

    /// Reads a quoted string, or a bare word in text mode.
    pub fn read_string(&mut self) -> Result<String, FieldError> {
        if self.is_binary() {
            return self.read_padded_string();
        }
        match self.peek_char() {
            None => Err(self.premature_eof()),
            Some('"') => self.read_quoted(),
            Some(_) => Ok(self.read_token(|c| !c.is_whitespace() && !matches!(c, ',' | ']'))),
        }
    }

    fn read_quoted(&mut self) -> Result<String, FieldError> {
        self.read_char()?;
        let Source::Text(text) = &self.source else {
            return Err(self.error("quoted string in binary input"));
        };
        let mut value = String::new();
        let mut escaped = false;
        let mut consumed = 0;
        let mut closed = false;
        let mut newlines = 0;
        for c in text[self.pos..].chars() {
            consumed += c.len_utf8();
            if c == '\n' {
                newlines += 1;
            }
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                closed = true;
                break;
            } else {
                value.push(c);
            }
        }
        self.pos += consumed;
        self.line += newlines;
        if !closed {
            return Err(self.error("unterminated string"));
        }
        Ok(value)
    }

    fn number_token(&mut self) -> Result<String, FieldError> {
        let token = self.read_token(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
        if token.is_empty() {
            return Err(self.unexpected("a number"));
        }
        Ok(token)
    }

    pub fn read_f32(&mut self) -> Result<f32, FieldError> {
        if self.is_binary() {
            return self.read_word().map(f32::from_bits);
        }
        let token = self.number_token()?;
        token
            .parse()
            .map_err(|_| self.error(format!("expected a number, got '{token}'")))
    }

    pub fn read_i32(&mut self) -> Result<i32, FieldError> {
        if self.is_binary() {
            return self.read_word().map(|w| w as i32);
        }
        let token = self.number_token()?;
        token
            .parse()
            .map_err(|_| self.error(format!("expected an integer, got '{token}'")))
    }

    pub fn read_u32(&mut self) -> Result<u32, FieldError> {
        if self.is_binary() {
            return self.read_word();
        }
        let token = self.number_token()?;
        token
            .parse()
            .map_err(|_| self.error(format!("expected an unsigned integer, got '{token}'")))
    }

    pub fn read_bool(&mut self) -> Result<bool, FieldError> {
        if self.is_binary() {
            return self.read_word().map(|w| w != 0);
        }
        if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            return Ok(self.read_i32()? != 0);
        }
        let word = self.read_name()?;
        match word.as_str() {
            "TRUE" | "true" => Ok(true),
            "FALSE" | "false" => Ok(false),
            _ => Err(self.error(format!("expected TRUE or FALSE, got '{word}'"))),
        }
    }

    fn read_word(&mut self) -> Result<u32, FieldError> {
        let Source::Binary(data) = &self.source else {
            return Err(self.error("binary word in text input"));
        };
        let mut rest = &data[self.pos.min(data.len())..];
        if rest.remaining() < 4 {
            return Err(self.premature_eof());
        }
        let word = rest.get_u32();
        self.pos += 4;
        Ok(word)
    }

    fn read_padded_string(&mut self) -> Result<String, FieldError> {
        let len = self.read_word()? as usize;
        let Source::Binary(data) = &self.source else {
            return Err(self.error("binary string in text input"));
        };
        let padded = len + (4 - len % 4) % 4;
        if data.len() < self.pos + padded {
            return Err(self.premature_eof());
        }
        let value = String::from_utf8(data[self.pos..self.pos + len].to_vec())
            .map_err(|_| self.error("string is not valid UTF-8"))?;
        self.pos += padded;
        Ok(value)
    }
}
