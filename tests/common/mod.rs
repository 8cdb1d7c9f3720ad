//! Helpers shared by the integration tests.

#![allow(dead_code)]

use misra_pingpong::{Config, MisraError, Token, TokenSink, Workload};
use std::time::Duration;
use tokio::sync::mpsc;

/// Workload that reports `(peer, sequence)` for every critical section.
pub struct Record {
    pub peer: &'static str,
    pub events: mpsc::UnboundedSender<(&'static str, i64)>,
}

impl Record {
    pub fn new(peer: &'static str, events: mpsc::UnboundedSender<(&'static str, i64)>) -> Self {
        Self { peer, events }
    }
}

impl Workload for Record {
    async fn run(&mut self, sequence: i64) {
        let _ = self.events.send((self.peer, sequence));
    }
}

/// Sink that silently swallows `target` the first time it is sent.
pub struct DropOnce {
    pub inner: mpsc::Sender<Token>,
    pub target: Token,
    pub dropped: bool,
}

impl DropOnce {
    pub fn new(inner: mpsc::Sender<Token>, target: i64) -> Self {
        Self {
            inner,
            target: token(target),
            dropped: false,
        }
    }
}

impl TokenSink for DropOnce {
    async fn send_token(&mut self, token: Token) -> Result<(), MisraError> {
        if !self.dropped && token == self.target {
            self.dropped = true;
            return Ok(());
        }
        self.inner.send_token(token).await
    }
}

/// Sink whose first `failures` sends fail.
pub struct Flaky {
    pub inner: mpsc::Sender<Token>,
    pub failures: u32,
}

impl TokenSink for Flaky {
    async fn send_token(&mut self, token: Token) -> Result<(), MisraError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(MisraError::OutboundClosed);
        }
        self.inner.send_token(token).await
    }
}

pub fn token(value: i64) -> Token {
    Token::new(value).unwrap()
}

pub fn config(initiator: bool) -> Config {
    let mut config = Config::new(0, "127.0.0.1:0".into(), initiator);
    config.ping_timeout = Duration::from_millis(100);
    config.send_retry_delay = Duration::from_millis(10);
    config.dial_retry_delay = Duration::from_millis(50);
    config
}

/// Collects `count` critical sections, failing the test after `limit`.
pub async fn collect(
    events: &mut mpsc::UnboundedReceiver<(&'static str, i64)>,
    count: usize,
    limit: Duration,
) -> Vec<(&'static str, i64)> {
    tokio::time::timeout(limit, async {
        let mut seen = Vec::with_capacity(count);
        while seen.len() < count {
            seen.push(events.recv().await.expect("event channel closed"));
        }
        seen
    })
    .await
    .expect("ring made no progress")
}
