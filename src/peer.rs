use crate::*;
use color_print::cformat;
use tokio::{net::TcpListener, sync::mpsc};

/// A ring member: owns its configuration and the work it runs in the critical section.
pub struct Peer<W> {
    pub config: Config,
    pub workload: W,
}

impl<W: Workload + Send> Peer<W> {
    pub fn new(config: Config, workload: W) -> Self {
        Self { config, workload }
    }

    /// Function that binds the listening port and runs the peer.
    pub async fn run(self) -> Result<()> {
        self.config.validate()?;
        let listener = link::bind(self.config.listen_port).await?;
        self.run_with_listener(listener).await
    }

    /// Function that runs the peer on an already bound listener.
    ///
    /// Non-initiators accept the previous peer before dialing the next one;
    /// the initiator dials first, accepts, then seeds the ring. At most one
    /// peer of the ring may be the initiator.
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<()> {
        self.config.validate()?;
        let Self { config, workload } = self;

        let (inbound_stream, outbound_stream) = if config.initiator {
            let outbound =
                link::dial(&config.send_address, config.dial_retry_delay, config.dial_attempts)
                    .await?;
            let inbound = link::accept(&listener).await?;
            (inbound, outbound)
        } else {
            let inbound = link::accept(&listener).await?;
            let outbound =
                link::dial(&config.send_address, config.dial_retry_delay, config.dial_attempts)
                    .await?;
            (inbound, outbound)
        };
        drop(listener);

        let (handoff, inbound) = mpsc::channel::<Token>(config.channel_capacity);
        let reader = link::spawn_reader(inbound_stream, handoff);

        let outbound = LossySink::new(LineSink::new(outbound_stream), config.loss_probability);
        if config.loss_probability > 0.0 {
            log::warn(&cformat!(
                "Dropping outgoing pings with probability <bold>{}</bold>.",
                config.loss_probability
            ));
        }

        let machine = TokenMachine::new(config.sequence_mode, config.consistency_policy);
        let mut scheduler = Scheduler::new(machine, inbound, outbound, workload, &config);

        if config.initiator {
            scheduler.seed().await?;
        }

        let result = scheduler.run().await;
        reader.abort();
        result
    }
}
