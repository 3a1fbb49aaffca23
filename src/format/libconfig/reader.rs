//! Reader for libconfig text.
//!
//! Produces a small document tree; the bridge in the parent module maps it
//! onto a configuration. Supported: `=`/`:` settings with optional `;`/`,`
//! terminators, groups `{}`, scalar arrays `[]`, lists `()`, booleans,
//! decimal and hex integers with `L`/`LL` suffixes, floats, strings with
//! escapes and adjacent-literal concatenation, and `#`, `//`, `/* */` comments.

use std::fmt;

use crate::cast::checked_cast;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Node {
    Boolean(bool),
    Int(i32),
    Int64(i64),
    Float(f64),
    Str(String),
    Array(Vec<Node>),
    List(Vec<Node>),
    Group(Vec<(String, Node)>),
}

impl Node {
    // Array elements must share one scalar kind; both integer widths count as one.
    fn scalar_kind(&self) -> Option<u8> {
        match self {
            Self::Boolean(_) => Some(0),
            Self::Int(_) | Self::Int64(_) => Some(1),
            Self::Float(_) => Some(2),
            Self::Str(_) => Some(3),
            Self::Array(_) | Self::List(_) | Self::Group(_) => None,
        }
    }
}

/// Reads the top-level settings of a document.
pub(super) fn read(text: &str) -> Result<Vec<(String, Node)>> {
    Reader { src: text, pos: 0 }.settings(None)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, message: impl fmt::Display) -> ConfigError {
        let consumed = &self.src[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        ConfigError::parse(format!("libconfig line {line}, column {column}: {message}"))
    }

    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            let rest = self.rest();
            if let Some(comment) = rest.strip_prefix("/*") {
                match comment.find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(self.error("unterminated comment")),
                }
            } else if rest.starts_with("//") || rest.starts_with('#') {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else {
                return Ok(());
            }
        }
    }

    /// Reads settings up to `close`, or to the end of input when `None`.
    fn settings(&mut self, close: Option<char>) -> Result<Vec<(String, Node)>> {
        let mut settings: Vec<(String, Node)> = Vec::new();
        loop {
            self.skip_trivia()?;
            match (self.peek(), close) {
                (None, None) => return Ok(settings),
                (None, Some(c)) => return Err(self.error(format!("expected '{c}' before end of input"))),
                (Some(c), Some(expected)) if c == expected => {
                    self.bump();
                    return Ok(settings);
                }
                (Some('@'), _) => return Err(self.error("@include directives are not supported")),
                _ => {}
            }

            let name = self.name()?;
            if settings.iter().any(|(existing, _)| *existing == name) {
                return Err(self.error(format!("duplicate setting '{name}'")));
            }
            self.skip_trivia()?;
            if !matches!(self.bump(), Some('=' | ':')) {
                return Err(self.error(format!("expected '=' or ':' after '{name}'")));
            }
            let value = self.value()?;
            self.skip_trivia()?;
            if matches!(self.peek(), Some(';' | ',')) {
                self.bump();
            }
            settings.push((name, value));
        }
    }

    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '*' => {
                self.bump();
            }
            _ => return Err(self.error("expected a setting name")),
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '*') {
                self.bump();
            } else {
                break;
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn value(&mut self) -> Result<Node> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => {
                self.bump();
                Ok(Node::Group(self.settings(Some('}'))?))
            }
            Some('[') => {
                self.bump();
                let items = self.elements(']')?;
                let kind = items.first().and_then(Node::scalar_kind);
                if items.iter().any(|item| item.scalar_kind().is_none() || item.scalar_kind() != kind) {
                    return Err(self.error("array elements must be scalars of one type"));
                }
                Ok(Node::Array(items))
            }
            Some('(') => {
                self.bump();
                Ok(Node::List(self.elements(')')?))
            }
            Some('"') => self.string().map(Node::Str),
            Some(_) => self.scalar(),
            None => Err(self.error("expected a value")),
        }
    }

    fn elements(&mut self, close: char) -> Result<Vec<Node>> {
        let mut items = Vec::new();
        self.skip_trivia()?;
        if self.peek() == Some(close) {
            self.bump();
            return Ok(items);
        }
        loop {
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.bump() {
                Some(',') => {}
                Some(c) if c == close => return Ok(items),
                _ => return Err(self.error(format!("expected ',' or '{close}'"))),
            }
        }
    }

    // `\xNN` escapes are raw bytes, so the text is decoded as UTF-8 once complete.
    fn string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        while self.peek() == Some('"') {
            self.bump();
            loop {
                match self.bump() {
                    None => return Err(self.error("unterminated string")),
                    Some('"') => break,
                    Some('\\') => self.escape(&mut bytes)?,
                    Some(c) => bytes.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
                }
            }
            // "a" "b" is the same as "ab"
            self.skip_trivia()?;
        }
        String::from_utf8(bytes).map_err(|e| self.error(format!("string is not valid UTF-8: {e}")))
    }

    fn escape(&mut self, bytes: &mut Vec<u8>) -> Result<()> {
        let byte = match self.bump() {
            Some('"') => b'"',
            Some('\\') => b'\\',
            Some('n') => b'\n',
            Some('r') => b'\r',
            Some('t') => b'\t',
            Some('f') => 0x0c,
            Some('x') => {
                let rest = self.rest();
                let digits = rest.get(..2).filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()));
                let byte = digits
                    .and_then(|d| u8::from_str_radix(d, 16).ok())
                    .ok_or_else(|| self.error("expected two hex digits after \\x"))?;
                self.pos += 2;
                byte
            }
            _ => return Err(self.error("invalid escape sequence")),
        };
        bytes.push(byte);
        Ok(())
    }

    fn scalar(&mut self) -> Result<Node> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_') {
                self.bump();
            } else {
                break;
            }
        }
        let src = self.src;
        let token = &src[start..self.pos];
        if token.is_empty() {
            let found = self.peek().map(String::from).unwrap_or_default();
            return Err(self.error(format!("unexpected character '{found}'")));
        }
        parse_scalar(token).ok_or_else(|| self.error(format!("invalid value '{token}'")))
    }
}

fn parse_scalar(token: &str) -> Option<Node> {
    if token.eq_ignore_ascii_case("true") {
        return Some(Node::Boolean(true));
    }
    if token.eq_ignore_ascii_case("false") {
        return Some(Node::Boolean(false));
    }
    parse_integer(token).or_else(|| parse_float(token))
}

fn parse_integer(token: &str) -> Option<Node> {
    let (body, long) = match token.strip_suffix("LL").or_else(|| token.strip_suffix('L')) {
        Some(body) => (body, true),
        None => (token, false),
    };
    let value = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => {
            if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            i64::from_str_radix(hex, 16).ok()?
        }
        None => {
            let digits = body.strip_prefix(['+', '-']).unwrap_or(body);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            body.parse::<i64>().ok()?
        }
    };
    if long {
        return Some(Node::Int64(value));
    }
    // Unsuffixed literals too wide for 32 bit are promoted, as libconfig does.
    Some(match checked_cast::<i32, i64>(value) {
        Ok(narrow) => Node::Int(narrow),
        Err(_) => Node::Int64(value),
    })
}

fn parse_float(token: &str) -> Option<Node> {
    let well_formed = token.bytes().any(|b| b.is_ascii_digit())
        && token.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !well_formed {
        return None;
    }
    token.parse::<f64>().ok().map(Node::Float)
}
