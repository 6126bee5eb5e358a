//! Token writer for the field serialization formats.

use bytes::{BufMut, BytesMut};

/// In-memory output stream, either text or binary.
///
/// Text mode writes human-readable tokens and leaves spacing to the caller.
/// Binary mode writes big-endian 32-bit words; strings are a length word
/// followed by the bytes, padded to a word boundary.
#[derive(Debug)]
pub struct Output {
    buf: BytesMut,
    binary: bool,
    indent_level: usize,
    indent_width: usize,
}

impl Output {
    pub fn text() -> Self {
        Self {
            buf: BytesMut::new(),
            binary: false,
            indent_level: 0,
            indent_width: 2,
        }
    }

    pub fn binary() -> Self {
        Self {
            binary: true,
            ..Self::text()
        }
    }

    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn increment_indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn decrement_indent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Writes the current indentation (text mode only).
    pub fn indent(&mut self) {
        if !self.binary {
            for _ in 0..self.indent_level * self.indent_width {
                self.buf.put_u8(b' ');
            }
        }
    }

    /// Writes a single character verbatim (text mode only).
    pub fn write_char(&mut self, c: char) {
        if !self.binary {
            let mut tmp = [0u8; 4];
            self.buf.put_slice(c.encode_utf8(&mut tmp).as_bytes());
        }
    }

    /// Writes raw text verbatim (text mode only).
    pub fn write_raw(&mut self, s: &str) {
        if !self.binary {
            self.buf.put_slice(s.as_bytes());
        }
    }

    /// Writes an identifier: bare in text mode, a string in binary mode.
    pub fn write_name(&mut self, name: &str) {
        if self.binary {
            self.put_padded(name.as_bytes());
        } else {
            self.buf.put_slice(name.as_bytes());
        }
    }

    /// Writes a string value: quoted and escaped in text mode.
    pub fn write_string(&mut self, s: &str) {
        if self.binary {
            self.put_padded(s.as_bytes());
            return;
        }
        self.buf.put_u8(b'"');
        for c in s.chars() {
            match c {
                '"' => self.buf.put_slice(b"\\\""),
                '\\' => self.buf.put_slice(b"\\\\"),
                _ => self.write_char(c),
            }
        }
        self.buf.put_u8(b'"');
    }

    pub fn write_f32(&mut self, value: f32) {
        if self.binary {
            self.buf.put_f32(value);
        } else {
            self.buf.put_slice(value.to_string().as_bytes());
        }
    }

    pub fn write_i32(&mut self, value: i32) {
        if self.binary {
            self.buf.put_i32(value);
        } else {
            self.buf.put_slice(value.to_string().as_bytes());
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        if self.binary {
            self.buf.put_u32(value);
        } else {
            self.buf.put_slice(value.to_string().as_bytes());
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        if self.binary {
            self.buf.put_i32(i32::from(value));
        } else {
            let token: &[u8] = if value { b"TRUE" } else { b"FALSE" };
            self.buf.put_slice(token);
        }
    }

    fn put_padded(&mut self, bytes: &[u8]) {
        self.buf.put_u32(bytes.len() as u32);
        self.buf.put_slice(bytes);
        let padding = (4 - bytes.len() % 4) % 4;
        self.buf.put_bytes(0, padding);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// The written text; binary content is decoded lossily.
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}
