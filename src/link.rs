//! Module with the two point-to-point links of a peer.
//!
//! A peer reads tokens from the previous peer on the inbound link and writes
//! tokens to the next peer on the outbound link. Each direction has exactly
//! one owner: the reader task for inbound, the [`crate::Scheduler`] for outbound.

use crate::{log, MisraError, Result, Token, TokenKind, TokenSink};
use color_print::cformat;
use futures::{SinkExt, StreamExt};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{io, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
    time::sleep,
};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Longest accepted inbound line. Any valid token is at most 20 characters.
pub const MAX_LINE_LENGTH: usize = 32;

/// Function that opens the listening socket for the previous peer.
pub async fn bind(port: u16) -> Result<TcpListener> {
    log::info(&cformat!("Listening on port <bold>{port}</bold>."));
    TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|source| MisraError::Listen { port, source })
}

/// Function that accepts the single inbound connection.
pub async fn accept(listener: &TcpListener) -> Result<TcpStream> {
    let (stream, address) = listener.accept().await.map_err(MisraError::Accept)?;
    log::success(&cformat!("Connection established with <bold>{address}</bold>."));
    Ok(stream)
}

/// Function that connects to the next peer, retrying with a fixed delay.
pub async fn dial(address: &str, retry_delay: Duration, attempts: Option<u32>) -> Result<TcpStream> {
    log::info(&cformat!("Trying to connect to <bold>{address}</bold>."));
    let mut attempt = 0;

    loop {
        attempt += 1;
        match TcpStream::connect(address).await {
            Ok(stream) => {
                log::success(&cformat!("Successfully connected to <bold>{address}</bold>."));
                return Ok(stream);
            }
            Err(source) if attempts.is_some_and(|limit| attempt >= limit) => {
                return Err(MisraError::Connect {
                    address: address.to_string(),
                    attempts: attempt,
                    source,
                });
            }
            Err(_) => {
                log::error(&cformat!(
                    "Error connecting to <bold>{address}</bold>. Retrying..."
                ));
                sleep(retry_delay).await;
            }
        }
    }
}

/// Outbound link writing one token per line.
pub struct LineSink<W> {
    lines: FramedWrite<W, LinesCodec>,
}

impl<W: AsyncWrite + Unpin> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            lines: FramedWrite::new(writer, LinesCodec::new()),
        }
    }
}

impl<W: AsyncWrite + Unpin + Send> TokenSink for LineSink<W> {
    async fn send_token(&mut self, token: Token) -> Result<()> {
        self.lines.send(token.to_json_string()?).await?;
        Ok(())
    }
}

/// Sink that drops outgoing ping tokens with a fixed probability while
/// reporting them as sent, simulating a token lost between peers.
pub struct LossySink<S> {
    inner: S,
    probability: f64,
    rng: SmallRng,
}

impl<S> LossySink<S> {
    pub fn new(inner: S, probability: f64) -> Self {
        Self {
            inner,
            probability,
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn with_seed(inner: S, probability: f64, seed: u64) -> Self {
        Self {
            inner,
            probability,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl<S: TokenSink + Send> TokenSink for LossySink<S> {
    async fn send_token(&mut self, token: Token) -> Result<()> {
        if token.kind() == TokenKind::Ping && self.rng.random::<f64>() < self.probability {
            log::warn(&cformat!("Dropping <bold>{token}</bold> (simulated loss)."));
            return Ok(());
        }
        self.inner.send_token(token).await
    }
}

/// Function that decodes tokens from the inbound link and hands them to the scheduler.
///
/// Malformed lines, including ones that are not UTF-8, are logged and
/// skipped. Returns when the link or the
/// handoff channel closes.
pub async fn forward_tokens<R: AsyncRead + Unpin>(reader: R, handoff: mpsc::Sender<Token>) {
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    // the framed reader yields a single `None` after a decode error, then resumes
    let mut errored = false;

    loop {
        match lines.next().await {
            Some(Ok(line)) => match Token::from_json_string(&line) {
                Ok(token) => {
                    if handoff.send(token).await.is_err() {
                        return;
                    }
                }
                Err(e) => log::error(&format!("{e}")),
            },
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                log::error(&format!(
                    "Discarding a line longer than {MAX_LINE_LENGTH} bytes."
                ));
                errored = true;
            }
            Some(Err(LinesCodecError::Io(e))) if e.kind() == io::ErrorKind::InvalidData => {
                log::error(&format!("Discarding a line that is not UTF-8: {e}"));
                errored = true;
            }
            Some(Err(LinesCodecError::Io(e))) => {
                log::error(&format!("Inbound link failed: {e}"));
                break;
            }
            None if errored => errored = false,
            None => break,
        }
    }

    log::warn("Inbound link closed.");
}

/// Function that spawns the reader task of the inbound link.
pub fn spawn_reader(stream: TcpStream, handoff: mpsc::Sender<Token>) -> JoinHandle<()> {
    tokio::spawn(forward_tokens(stream, handoff))
}
