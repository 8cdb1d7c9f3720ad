//! Entry point of a ring peer.
//!
//! Parses the command line into a [`Config`] and a workload, then runs the
//! peer until its inbound link closes or a fatal error occurs.

use clap::Parser;
use misra_pingpong::{
    log, Config, ConsistencyPolicy, Delay, Peer, Poisson, SequenceMode, Work,
};
use std::{process, time::Duration};

/// Misra's ping-pong mutual exclusion between two peers.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Port to listen on for the previous peer.
    #[arg(short = 'l', long = "listen")]
    listen: u16,

    /// Address of the next peer (host:port).
    #[arg(short = 's', long = "send")]
    send: String,

    /// Seed the ring with the first token pair. Exactly one peer must set this.
    #[arg(short = 'i', long = "initiator", default_value_t = false)]
    initiator: bool,

    /// Probability in [0, 1) of dropping an outgoing ping.
    #[arg(short = 'p', long = "loss", default_value_t = 0.0, value_parser = parse_probability)]
    loss: f64,

    /// How long to wait for the pong while holding only the ping.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Fixed critical section length.
    #[arg(long, default_value_t = 1000)]
    work_ms: u64,

    /// Draw critical section lengths from a Poisson process with this rate (per second).
    #[arg(long, conflicts_with = "work_ms", value_parser = parse_rate)]
    work_rate: Option<f64>,

    /// Also run the critical section while holding only the ping.
    #[arg(long, default_value_t = false)]
    work_on_ping: bool,

    /// Wrap the sequence inside 1..=N instead of growing forever.
    #[arg(long)]
    ring_size: Option<i64>,

    /// Regenerate after this many inconsistent tokens in a row.
    #[arg(long, default_value_t = 3)]
    escalate_after: u32,

    /// Stop on the first inconsistent token instead.
    #[arg(long, default_value_t = false, conflicts_with = "escalate_after")]
    strict: bool,

    /// Give up dialing after this many attempts.
    #[arg(long)]
    dial_attempts: Option<u32>,
}

fn parse_probability(value: &str) -> Result<f64, String> {
    let p: f64 = value.parse().map_err(|_| format!("{value} is not a number"))?;
    if (0.0..1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{p} is not in [0, 1)"))
    }
}

fn parse_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value.parse().map_err(|_| format!("{value} is not a number"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("{rate} is not a positive rate"))
    }
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::new(self.listen, self.send.clone(), self.initiator);
        config.loss_probability = self.loss;
        config.ping_timeout = Duration::from_millis(self.timeout_ms);
        config.work_on_ping = self.work_on_ping;
        config.dial_attempts = self.dial_attempts;
        config.consistency_policy = if self.strict {
            ConsistencyPolicy::Fatal
        } else {
            ConsistencyPolicy::Escalate {
                threshold: self.escalate_after,
            }
        };
        if let Some(ring_size) = self.ring_size {
            config.sequence_mode = SequenceMode::Modular { ring_size };
        }
        config
    }

    fn work(&self) -> Work {
        match self.work_rate {
            Some(rate) => Work::Random(Poisson::from_entropy(rate)),
            None => Work::Fixed(Delay(Duration::from_millis(self.work_ms))),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let peer = Peer::new(cli.config(), cli.work());

    if let Err(e) = peer.run().await {
        log::error(&format!("{e}"));
        process::exit(1);
    }
}
