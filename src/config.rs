//! Module with the configuration of a peer.

use crate::{ConsistencyPolicy, MisraError, Result, SequenceMode, Token};
use std::time::Duration;

/// Smallest handoff capacity that can hold one pending token of each kind.
pub const MIN_CHANNEL_CAPACITY: usize = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_port: u16,
    /// `host:port` of the next peer.
    pub send_address: String,
    /// Exactly one peer of a ring must be the initiator.
    pub initiator: bool,
    /// Probability in `[0, 1)` of dropping an outgoing ping to exercise loss recovery.
    pub loss_probability: f64,
    pub ping_timeout: Duration,
    pub dial_retry_delay: Duration,
    /// `None` retries forever.
    pub dial_attempts: Option<u32>,
    pub send_retry_delay: Duration,
    pub channel_capacity: usize,
    pub consistency_policy: ConsistencyPolicy,
    pub sequence_mode: SequenceMode,
    /// Also run the workload while holding only the ping.
    pub work_on_ping: bool,
}

impl Config {
    pub fn new(listen_port: u16, send_address: String, initiator: bool) -> Self {
        Self {
            listen_port,
            send_address,
            initiator,
            loss_probability: 0.0,
            ping_timeout: Duration::from_secs(1),
            dial_retry_delay: Duration::from_secs(1),
            dial_attempts: None,
            send_retry_delay: Duration::from_secs(1),
            channel_capacity: MIN_CHANNEL_CAPACITY,
            consistency_policy: ConsistencyPolicy::default(),
            sequence_mode: SequenceMode::default(),
            work_on_ping: false,
        }
    }

    /// Function that checks the values a peer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.loss_probability) {
            return Err(MisraError::Config(format!(
                "loss probability {} is outside [0, 1)",
                self.loss_probability
            )));
        }
        if self.ping_timeout.is_zero() {
            return Err(MisraError::Config("ping timeout must be positive".into()));
        }
        if self.channel_capacity < MIN_CHANNEL_CAPACITY {
            return Err(MisraError::Config(format!(
                "channel capacity must be at least {MIN_CHANNEL_CAPACITY}"
            )));
        }
        if self.dial_attempts == Some(0) {
            return Err(MisraError::Config("dial attempts must be at least 1".into()));
        }
        if let ConsistencyPolicy::Escalate { threshold: 0 } = self.consistency_policy {
            return Err(MisraError::Config("escalation threshold must be at least 1".into()));
        }
        if let SequenceMode::Modular { ring_size } = self.sequence_mode {
            if ring_size < 3 {
                return Err(MisraError::Config(format!(
                    "ring size {ring_size} is too small, it must be at least 3"
                )));
            }
            if ring_size > Token::MAX_SEQUENCE {
                return Err(MisraError::Config(format!(
                    "ring size {ring_size} is too large, it must be at most {}",
                    Token::MAX_SEQUENCE
                )));
            }
        }
        Ok(())
    }
}
