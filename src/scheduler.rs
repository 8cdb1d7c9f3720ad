//! Module with the loop that drives a [`TokenMachine`] and detects lost tokens.
//!
//! The scheduler owns the machine, the receiving end of the reader handoff and
//! the outbound sink. Nothing else mutates the machine, so no locking is
//! involved. Each pass looks at the disposition:
//!
//! - `NONE`: wait for the next token, without bound.
//! - `PING`: wait at most `ping_timeout` for the pong; on timeout forward the ping.
//! - `PONG`: forward the pong at once.
//! - `BOTH`: incarnate, run the critical section, release ping then pong.

use crate::{
    log, Config, Disposition, MisraError, Received, Result, Token, TokenKind, TokenMachine,
    Workload,
};
use color_print::cformat;
use std::{future::Future, time::Duration};
use tokio::{
    sync::mpsc,
    time::{sleep, timeout},
};

/// Outbound half of a link, as seen by the scheduler.
pub trait TokenSink {
    fn send_token(&mut self, token: Token) -> impl Future<Output = Result<()>> + Send;
}

impl TokenSink for mpsc::Sender<Token> {
    async fn send_token(&mut self, token: Token) -> Result<()> {
        self.send(token)
            .await
            .map_err(|_| MisraError::OutboundClosed)
    }
}

pub struct Scheduler<S, W> {
    machine: TokenMachine,
    inbound: mpsc::Receiver<Token>,
    outbound: S,
    workload: W,
    ping_timeout: Duration,
    send_retry_delay: Duration,
    work_on_ping: bool,
    /// Set once the current `BOTH` episode has incarnated and run its work,
    /// so a failed release does not repeat them.
    released_pending: bool,
}

impl<S, W> Scheduler<S, W>
where
    S: TokenSink + Send,
    W: Workload + Send,
{
    pub fn new(
        machine: TokenMachine,
        inbound: mpsc::Receiver<Token>,
        outbound: S,
        workload: W,
        config: &Config,
    ) -> Self {
        Self {
            machine,
            inbound,
            outbound,
            workload,
            ping_timeout: config.ping_timeout,
            send_retry_delay: config.send_retry_delay,
            work_on_ping: config.work_on_ping,
            released_pending: false,
        }
    }

    pub fn machine(&self) -> &TokenMachine {
        &self.machine
    }

    /// Function that puts the first pair in the ring (initiator only).
    pub async fn seed(&mut self) -> Result<()> {
        log::info(&cformat!("Seeding the ring with the first <bold>token pair</bold>."));
        self.machine.seed();
        self.released_pending = true;
        self.release_both().await;
        Ok(())
    }

    /// Function that runs the scheduler until the inbound link closes or a fatal error occurs.
    pub async fn run(mut self) -> Result<()> {
        loop {
            self.step().await?;
        }
    }

    /// Function that runs a single scheduling pass.
    pub async fn step(&mut self) -> Result<()> {
        if self.machine.disposition() != Disposition::Both {
            self.released_pending = false;
        }

        match self.machine.disposition() {
            Disposition::None => {
                let token = self.inbound.recv().await.ok_or(MisraError::InboundClosed)?;
                self.deliver(token)
            }
            Disposition::Ping => {
                if self.work_on_ping {
                    self.critical_section().await;
                }

                match timeout(self.ping_timeout, self.inbound.recv()).await {
                    Ok(Some(token)) => self.deliver(token),
                    Ok(None) => Err(MisraError::InboundClosed),
                    Err(_) => {
                        log::warn(&cformat!(
                            "No token for <bold>{:?}</bold>, forwarding <bold>PING {}</bold>.",
                            self.ping_timeout,
                            self.machine.ping()
                        ));
                        self.send(TokenKind::Ping).await;
                        Ok(())
                    }
                }
            }
            Disposition::Pong => {
                self.send(TokenKind::Pong).await;
                Ok(())
            }
            Disposition::Both => {
                if !self.released_pending {
                    log::info("Both tokens acquired, incarnating.");
                    self.machine.incarnate();
                    log::info(&cformat!(
                        "New token values PING: <bold>{}</bold>, PONG: <bold>{}</bold>.",
                        self.machine.ping(),
                        self.machine.pong()
                    ));
                    self.critical_section().await;
                    self.released_pending = true;
                }
                self.release_both().await;
                Ok(())
            }
        }
    }

    fn deliver(&mut self, token: Token) -> Result<()> {
        match self.machine.receive(token) {
            Ok(Received::Stale) => {
                log::info(&cformat!("Old token <bold>{token}</bold>, ignoring."));
            }
            Ok(Received::Lost) => {
                let lost = match token.kind() {
                    TokenKind::Ping => TokenKind::Pong,
                    TokenKind::Pong => TokenKind::Ping,
                };
                log::warn(&cformat!(
                    "<bold>{lost}</bold> token lost, regenerating at <bold>{}</bold>.",
                    self.machine.ping()
                ));
            }
            Ok(Received::Acquired(disposition)) => {
                log::info(&cformat!(
                    "Received <bold>{token}</bold>, holding <bold>{disposition}</bold>."
                ));
            }
            Ok(Received::Violation { count }) => {
                log::error(&cformat!(
                    "Received <bold>{token}</bold> while holding <bold>{}</bold> ({count} in a row), ignoring.",
                    self.machine.disposition()
                ));
            }
            Ok(Received::Escalated) => {
                log::warn(&cformat!(
                    "Too many inconsistent tokens, regenerating at <bold>{}</bold>.",
                    self.machine.ping()
                ));
            }
            Err(e) => {
                log::error(&format!("{e}"));
                return Err(e);
            }
        }
        Ok(())
    }

    async fn critical_section(&mut self) {
        let sequence = self.machine.ping();
        log::success(&cformat!(
            "Entering critical section at <bold>{sequence}</bold>."
        ));
        self.workload.run(sequence).await;
        log::success("Leaving critical section.");
    }

    /// Releases ping then pong, stopping at the first failure.
    async fn release_both(&mut self) {
        for kind in [TokenKind::Ping, TokenKind::Pong] {
            if self.machine.disposition().holds(kind) && !self.send(kind).await {
                return;
            }
        }
        self.released_pending = false;
    }

    /// A failed send leaves the machine untouched; the next pass retries.
    async fn send(&mut self, kind: TokenKind) -> bool {
        let token = self.machine.outgoing(kind);

        match self.outbound.send_token(token).await {
            Ok(()) => {
                self.machine.sent(kind);
                log::success(&cformat!("Token sent: <bold>{token}</bold>."));
                true
            }
            Err(e) => {
                log::error(&format!("Couldn't send {token}: {e}"));
                sleep(self.send_retry_delay).await;
                false
            }
        }
    }
}
