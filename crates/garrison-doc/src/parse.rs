//! Strict JSON parsing into offset-carrying nodes.
//!
//! `serde_json` is used for emission only; loading goes through this parser
//! because every node must remember where its first token sits in the source
//! buffer. The grammar is plain JSON: no comments, no trailing commas. A
//! duplicate key within one object keeps the last value.

use std::collections::BTreeMap;

use crate::node::{Node, Value};

/// A parse failure with the byte offset it was detected at. The caller maps
/// the offset to a line and column against the buffer it parsed.
#[derive(Debug)]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

/// Nesting ceiling for objects and arrays combined. Documents this engine
/// handles are a few levels deep; anything past this is malformed or hostile.
const MAX_DEPTH: usize = 128;

/// Parses one complete JSON document. Trailing non-whitespace is an error.
pub fn parse_document(text: &str) -> Result<Node, SyntaxError> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        text,
        pos: 0,
        depth: 0,
    };
    parser.skip_whitespace();
    let node = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return parser.fail("unexpected trailing content");
    }
    Ok(node)
}

struct Parser<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn fail<T>(&self, message: impl Into<String>) -> Result<T, SyntaxError> {
        self.fail_at(self.pos, message)
    }

    fn fail_at<T>(&self, offset: usize, message: impl Into<String>) -> Result<T, SyntaxError> {
        Err(SyntaxError {
            message: message.into(),
            offset,
        })
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), SyntaxError> {
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => self.fail(format!(
                "expected '{}', found '{}'",
                expected as char, b as char
            )),
            None => self.fail(format!("expected '{}', found end of input", expected as char)),
        }
    }

    fn parse_value(&mut self) -> Result<Node, SyntaxError> {
        match self.peek() {
            None => self.fail("unexpected end of input"),
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => {
                let offset = self.pos;
                let s = self.parse_string_token()?;
                Ok(Node::new(Value::String(s), offset))
            }
            Some(b't') | Some(b'f') | Some(b'n') => self.parse_keyword(),
            Some(b'-') | Some(b'0'..=b'9') => self.parse_number(),
            Some(b) => self.fail(format!("unexpected character '{}'", b as char)),
        }
    }

    fn parse_object(&mut self) -> Result<Node, SyntaxError> {
        let offset = self.pos;
        self.enter_nesting()?;
        self.expect(b'{')?;
        let mut members = BTreeMap::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Node::new(Value::Object(members), offset));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return self.fail("expected a string key");
            }
            let key = self.parse_string_token()?;
            self.skip_whitespace();
            self.expect(b':')?;
            self.skip_whitespace();
            let value = self.parse_value()?;
            // duplicate keys keep the last occurrence
            members.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => return self.fail("expected ',' or '}'"),
            }
        }
        self.depth -= 1;
        Ok(Node::new(Value::Object(members), offset))
    }

    fn parse_array(&mut self) -> Result<Node, SyntaxError> {
        let offset = self.pos;
        self.enter_nesting()?;
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Node::new(Value::Array(items), offset));
        }
        loop {
            self.skip_whitespace();
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return self.fail("expected ',' or ']'"),
            }
        }
        self.depth -= 1;
        Ok(Node::new(Value::Array(items), offset))
    }

    fn enter_nesting(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return self.fail("nesting too deep");
        }
        Ok(())
    }

    /// Consumes a quoted string starting at `pos`, returning the unescaped
    /// text. Raw byte runs are copied as slices; only escapes go char by
    /// char.
    fn parse_string_token(&mut self) -> Result<String, SyntaxError> {
        self.expect(b'"')?;
        let mut out = String::new();
        let mut run_start = self.pos;
        loop {
            match self.peek() {
                None => return self.fail("unterminated string"),
                Some(b'"') => {
                    out.push_str(&self.text[run_start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.text[run_start..self.pos]);
                    self.pos += 1;
                    let ch = self.parse_escape()?;
                    out.push(ch);
                    run_start = self.pos;
                }
                Some(b) if b < 0x20 => {
                    return self.fail("control character in string");
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, SyntaxError> {
        let escape_offset = self.pos - 1;
        let Some(b) = self.peek() else {
            return self.fail("unterminated escape");
        };
        self.pos += 1;
        let ch = match b {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => return self.parse_unicode_escape(escape_offset),
            other => {
                return self.fail_at(
                    escape_offset,
                    format!("invalid escape '\\{}'", other as char),
                );
            }
        };
        Ok(ch)
    }

    fn parse_unicode_escape(&mut self, escape_offset: usize) -> Result<char, SyntaxError> {
        let high = self.parse_hex4()?;
        // surrogate pairs arrive as two consecutive \u escapes
        if (0xD800..=0xDBFF).contains(&high) {
            if self.peek() != Some(b'\\') || self.bytes.get(self.pos + 1) != Some(&b'u') {
                return self.fail_at(escape_offset, "unpaired surrogate escape");
            }
            self.pos += 2;
            let low = self.parse_hex4()?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return self.fail_at(escape_offset, "invalid low surrogate");
            }
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            return match char::from_u32(code) {
                Some(ch) => Ok(ch),
                None => self.fail_at(escape_offset, "invalid surrogate pair"),
            };
        }
        if (0xDC00..=0xDFFF).contains(&high) {
            return self.fail_at(escape_offset, "unpaired surrogate escape");
        }
        match char::from_u32(high) {
            Some(ch) => Ok(ch),
            None => self.fail_at(escape_offset, "invalid unicode escape"),
        }
    }

    fn parse_hex4(&mut self) -> Result<u32, SyntaxError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let Some(b) = self.peek() else {
                return self.fail("truncated unicode escape");
            };
            let digit = match b {
                b'0'..=b'9' => u32::from(b - b'0'),
                b'a'..=b'f' => u32::from(b - b'a') + 10,
                b'A'..=b'F' => u32::from(b - b'A') + 10,
                _ => return self.fail("invalid hex digit in unicode escape"),
            };
            value = value * 16 + digit;
            self.pos += 1;
        }
        Ok(value)
    }

    fn parse_number(&mut self) -> Result<Node, SyntaxError> {
        let offset = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return self.fail_at(offset, "invalid number");
        }
        if self.bytes[digits_start] == b'0' && self.pos - digits_start > 1 {
            return self.fail_at(offset, "number has a leading zero");
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            let frac_start = self.pos;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
            if self.pos == frac_start {
                return self.fail("expected digits after decimal point");
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
            if self.pos == exp_start {
                return self.fail("expected digits in exponent");
            }
        }
        let literal = &self.text[offset..self.pos];
        if !is_float {
            if let Ok(i) = literal.parse::<i64>() {
                return Ok(Node::new(Value::Int(i), offset));
            }
            // magnitude beyond i64: fall through to float
        }
        match literal.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(Node::new(Value::Float(x), offset)),
            _ => self.fail_at(offset, "number out of range"),
        }
    }

    fn parse_keyword(&mut self) -> Result<Node, SyntaxError> {
        let offset = self.pos;
        let rest = &self.text[self.pos..];
        for (keyword, value) in [
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("null", Value::Null),
        ] {
            if rest.starts_with(keyword) {
                self.pos += keyword.len();
                return Ok(Node::new(value, offset));
            }
        }
        self.fail("unexpected keyword")
    }
}

// ============================================================================
// Tests
// ============================================================================
