//! Module that contains the token exchanged between peers and its wire codec.
//!
//! On the wire a token is its signed value written as decimal text on one
//! line: `v > 0` is the ping token of sequence `v`, `v < 0` is the pong token
//! of sequence `-v`. Decimal integers are valid JSON, so the codec goes
//! through `serde_json` like every other message type.

use crate::{MisraError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two tokens a value denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ping,
    Pong,
}

/// A ping or pong token. Never zero, and its magnitude is at most [`Token::MAX_SEQUENCE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Token(i64);

impl Token {
    /// Largest sequence accepted from the wire. Half the `i64` range is left
    /// as headroom so incarnating a received value never overflows.
    pub const MAX_SEQUENCE: i64 = i64::MAX / 2;

    /// Function that validates a raw value as a token.
    pub fn new(value: i64) -> Result<Self> {
        if value == 0 || !(-Self::MAX_SEQUENCE..=Self::MAX_SEQUENCE).contains(&value) {
            return Err(MisraError::InvalidToken(value));
        }
        Ok(Self(value))
    }

    /// Sequence values held by the machine are never zero.
    pub(crate) fn from_sequence(value: i64) -> Self {
        debug_assert!(value != 0 && value != i64::MIN);
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn kind(self) -> TokenKind {
        if self.0 > 0 {
            TokenKind::Ping
        } else {
            TokenKind::Pong
        }
    }

    /// Sequence number carried by the token, regardless of its kind.
    pub fn magnitude(self) -> i64 {
        self.0.abs()
    }

    /// Function that returns the token as it is written on the wire.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| MisraError::Decode {
            line: self.0.to_string(),
            reason: e.to_string(),
        })
    }

    /// Function that parses a token from one line of the wire.
    pub fn from_json_string(line: &str) -> Result<Self> {
        serde_json::from_str::<Self>(line).map_err(|e| MisraError::Decode {
            line: line.to_string(),
            reason: e.to_string(),
        })
    }
}

impl TryFrom<i64> for Token {
    type Error = MisraError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Token> for i64 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.0)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping => write!(f, "PING"),
            Self::Pong => write!(f, "PONG"),
        }
    }
}
