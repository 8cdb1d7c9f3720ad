//! Error types shared by the token machine, the links and the peer bootstrap.

use crate::{Disposition, Token};
use std::io;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Result type for ping-pong operations.
pub type Result<T> = std::result::Result<T, MisraError>;

#[derive(Debug, Error)]
pub enum MisraError {
    /// Zero (or a value whose magnitude does not fit) is not a token.
    #[error("{0} is not a valid token value")]
    InvalidToken(i64),

    /// A line read from the inbound link could not be parsed as a token.
    #[error("malformed token {line:?}: {reason}")]
    Decode { line: String, reason: String },

    #[error("failed to listen on port {port}: {source}")]
    Listen {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept the inbound connection: {0}")]
    Accept(#[source] io::Error),

    /// Only returned when a dial attempt limit is configured and exhausted.
    #[error("failed to connect to {address} after {attempts} attempts: {source}")]
    Connect {
        address: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to send token: {0}")]
    Send(#[from] LinesCodecError),

    /// A token of a kind already held arrived.
    #[error("received {token} while holding {disposition}")]
    Consistency {
        token: Token,
        disposition: Disposition,
    },

    #[error("the inbound link was closed")]
    InboundClosed,

    #[error("the outbound link was closed")]
    OutboundClosed,

    #[error("invalid configuration: {0}")]
    Config(String),
}
