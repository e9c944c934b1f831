//! Codec for the comma separated `key=value` / `key="value"` lists carried by
//! `WWW-Authenticate` and `Authorization` Digest headers.

use std::fmt::{self, Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// A single header parameter. Order in a list is kept as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
    pub quoted: bool,
}

impl Param {
    /// Parameter serialized as `key="value"`
    pub fn quoted(key: &str, value: impl Into<String>) -> Self {
        Param {
            key: key.to_string(),
            value: value.into(),
            quoted: true,
        }
    }

    /// Parameter serialized as `key=value`
    pub fn bare(key: &str, value: impl Into<String>) -> Self {
        Param {
            key: key.to_string(),
            value: value.into(),
            quoted: false,
        }
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "{}=\"{}\"", self.key, self.value.quote_for_digest())
        } else {
            write!(f, "{}={}", self.key, self.value)
        }
    }
}

/// Malformed parameter list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty parameter name")]
    EmptyKey,
    #[error("expected '=', got {0:?}")]
    ExpectedEquals(char),
    #[error("unexpected end of input")]
    UnexpectedEof,
}

/// slash quoting for digest strings
trait QuoteForDigest {
    fn quote_for_digest(&self) -> String;
}

impl QuoteForDigest for str {
    fn quote_for_digest(&self) -> String {
        self.replace('\\', "\\\\").replace('"', "\\\"")
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

fn is_separator(c: char) -> bool {
    c == ',' || c.is_ascii_whitespace()
}

/// Parse a parameter list. Any run of spaces and commas separates two
/// parameters.
pub fn parse(input: &str) -> Result<Vec<Param>, ParseError> {
    let mut chars = input.chars().peekable();
    let mut params = Vec::new();

    loop {
        while chars.next_if(|c| is_separator(*c)).is_some() {}
        if chars.peek().is_none() {
            break;
        }
        params.push(parse_param(&mut chars)?);
    }

    Ok(params)
}

/// Serialize parameters in their given order, joined by `", "`
pub fn format(params: &[Param]) -> String {
    params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_param(chars: &mut Peekable<Chars<'_>>) -> Result<Param, ParseError> {
    let key = parse_token(chars);
    if key.is_empty() {
        return Err(ParseError::EmptyKey);
    }

    match chars.next() {
        Some('=') => {}
        Some(c) => return Err(ParseError::ExpectedEquals(c)),
        None => return Err(ParseError::UnexpectedEof),
    }

    if chars.next_if_eq(&'"').is_some() {
        Ok(Param {
            key,
            value: parse_quoted(chars)?,
            quoted: true,
        })
    } else {
        Ok(Param {
            key,
            value: parse_token(chars),
            quoted: false,
        })
    }
}

fn parse_token(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut token = String::new();
    while let Some(c) = chars.next_if(|c| is_token_char(*c)) {
        token.push(c);
    }
    token
}

/// Read a quoted string whose opening quote was already consumed.
/// A backslash takes the next character literally.
fn parse_quoted(chars: &mut Peekable<Chars<'_>>) -> Result<String, ParseError> {
    let mut value = String::new();
    loop {
        match chars.next().ok_or(ParseError::UnexpectedEof)? {
            '"' => return Ok(value),
            '\\' => value.push(chars.next().ok_or(ParseError::UnexpectedEof)?),
            c => value.push(c),
        }
    }
}
