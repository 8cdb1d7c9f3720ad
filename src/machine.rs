//! Module with the per-peer token state machine.
//!
//! The machine owns which tokens the peer holds and the sequence values of the
//! ping/pong pair. It never touches a socket: the [`crate::Scheduler`] asks it
//! what to transmit, performs the transmission and reports back with
//! [`TokenMachine::sent`].

use crate::{MisraError, Result, Token, TokenKind};
use std::fmt;

/// Enum that tells which of the two tokens the peer currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Disposition {
    #[default]
    None,
    Ping,
    Pong,
    Both,
}

impl Disposition {
    pub fn holds(self, kind: TokenKind) -> bool {
        matches!(
            (self, kind),
            (Self::Both, _) | (Self::Ping, TokenKind::Ping) | (Self::Pong, TokenKind::Pong)
        )
    }

    /// Disposition after acquiring `kind`, or `None` if it is already held.
    pub fn acquire(self, kind: TokenKind) -> Option<Self> {
        match (self, kind) {
            (Self::None, TokenKind::Ping) => Some(Self::Ping),
            (Self::None, TokenKind::Pong) => Some(Self::Pong),
            (Self::Pong, TokenKind::Ping) | (Self::Ping, TokenKind::Pong) => Some(Self::Both),
            _ => None,
        }
    }

    /// Disposition after releasing `kind`. Releasing a token not held is a no-op.
    pub fn release(self, kind: TokenKind) -> Self {
        match (self, kind) {
            (Self::Ping, TokenKind::Ping) | (Self::Pong, TokenKind::Pong) => Self::None,
            (Self::Both, TokenKind::Ping) => Self::Pong,
            (Self::Both, TokenKind::Pong) => Self::Ping,
            (other, _) => other,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Ping => write!(f, "PING"),
            Self::Pong => write!(f, "PONG"),
            Self::Both => write!(f, "BOTH"),
        }
    }
}

/// Current values of the token pair and the last value this peer sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceState {
    pub ping: i64,
    /// Always `-ping` outside of [`TokenMachine::receive`].
    pub pong: i64,
    /// Last token value transmitted by this peer, 0 before the first send.
    pub m: i64,
}

impl Default for SequenceState {
    fn default() -> Self {
        Self {
            ping: 1,
            pong: -1,
            m: 0,
        }
    }
}

/// How the sequence advances on incarnation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceMode {
    /// `ping + 1`, saturating at `i64::MAX`.
    #[default]
    Unbounded,
    /// Wraps inside `1..=ring_size`; staleness uses serial-number comparison.
    /// Sizes outside `3..=Token::MAX_SEQUENCE` are clamped into that range.
    Modular { ring_size: i64 },
}

impl SequenceMode {
    pub fn next(self, ping: i64) -> i64 {
        match self {
            Self::Unbounded => ping.saturating_add(1),
            Self::Modular { ring_size } => ping.rem_euclid(modulus(ring_size)) + 1,
        }
    }

    /// Whether a token of magnitude `received` is older than the last sent magnitude.
    pub fn is_stale(self, received: i64, last_sent: i64) -> bool {
        match self {
            Self::Unbounded => received < last_sent,
            Self::Modular { ring_size } => {
                let ring_size = modulus(ring_size);
                if last_sent == 0 {
                    return false;
                }
                let behind = (last_sent - received).rem_euclid(ring_size);
                behind != 0 && behind <= ring_size / 2
            }
        }
    }
}

fn modulus(ring_size: i64) -> i64 {
    ring_size.clamp(3, Token::MAX_SEQUENCE)
}

/// What to do when a token of a kind already held arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyPolicy {
    /// Stop the peer with [`MisraError::Consistency`].
    Fatal,
    /// Ignore the token, but regenerate once `threshold` violations happen in a row.
    Escalate { threshold: u32 },
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self::Escalate { threshold: 3 }
    }
}

/// Outcome of [`TokenMachine::receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// Older than the last token sent; nothing changed.
    Stale,
    /// The token this peer last sent came back alone, so its partner was lost.
    /// The pair has been regenerated.
    Lost,
    /// The token was merged into the disposition.
    Acquired(Disposition),
    /// Duplicate kind ignored; `count` violations in a row so far.
    Violation { count: u32 },
    /// Too many violations in a row; the pair has been regenerated.
    Escalated,
}

#[derive(Debug, Clone, Default)]
pub struct TokenMachine {
    disposition: Disposition,
    state: SequenceState,
    mode: SequenceMode,
    policy: ConsistencyPolicy,
    violations: u32,
}

impl TokenMachine {
    pub fn new(mode: SequenceMode, policy: ConsistencyPolicy) -> Self {
        Self {
            mode,
            policy,
            ..Self::default()
        }
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn ping(&self) -> i64 {
        self.state.ping
    }

    pub fn pong(&self) -> i64 {
        self.state.pong
    }

    /// Function that merges an incoming token.
    pub fn receive(&mut self, token: Token) -> Result<Received> {
        if self
            .mode
            .is_stale(token.magnitude(), self.state.m.abs())
        {
            return Ok(Received::Stale);
        }

        if token.value() == self.state.m {
            self.regenerate();
            return Ok(Received::Lost);
        }

        let Some(next) = self.disposition.acquire(token.kind()) else {
            return self.violation(token);
        };

        match token.kind() {
            TokenKind::Ping => {
                self.state.ping = token.value();
                self.state.pong = -self.state.ping;
            }
            TokenKind::Pong => {
                self.state.pong = token.value();
                self.state.ping = -self.state.pong;
            }
        }
        self.disposition = next;
        self.violations = 0;

        Ok(Received::Acquired(next))
    }

    fn violation(&mut self, token: Token) -> Result<Received> {
        self.violations += 1;

        match self.policy {
            ConsistencyPolicy::Fatal => Err(MisraError::Consistency {
                token,
                disposition: self.disposition,
            }),
            ConsistencyPolicy::Escalate { threshold } if self.violations >= threshold => {
                self.regenerate();
                Ok(Received::Escalated)
            }
            ConsistencyPolicy::Escalate { .. } => Ok(Received::Violation {
                count: self.violations,
            }),
        }
    }

    /// Function that returns the token of `kind` at the current sequence.
    pub fn outgoing(&self, kind: TokenKind) -> Token {
        let value = match kind {
            TokenKind::Ping => self.state.ping,
            TokenKind::Pong => self.state.pong,
        };
        Token::from_sequence(value)
    }

    /// Function that records a successful transmission of `kind`.
    pub fn sent(&mut self, kind: TokenKind) -> Token {
        let token = self.outgoing(kind);
        self.state.m = token.value();
        self.disposition = self.disposition.release(kind);
        token
    }

    /// Function that advances the sequence of the pair.
    pub fn incarnate(&mut self) {
        self.state.ping = self.mode.next(self.state.ping);
        self.state.pong = -self.state.ping;
    }

    /// Function that reissues a fresh pair after a loss.
    pub fn regenerate(&mut self) {
        self.incarnate();
        self.disposition = Disposition::Both;
        self.violations = 0;
    }

    /// Function that hands the initiator the first pair without incarnating.
    pub fn seed(&mut self) {
        self.disposition = Disposition::Both;
    }
}
