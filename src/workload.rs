//! Module with the work a peer performs inside its critical section.

use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{future::Future, time::Duration};
use tokio::time::sleep;

/// Work run while the peer holds both tokens, before they are released.
///
/// `sequence` is the ping value the pair is about to be released with.
pub trait Workload {
    fn run(&mut self, sequence: i64) -> impl Future<Output = ()> + Send;
}

/// Critical section that just occupies the peer for a fixed time.
#[derive(Debug, Clone, Copy)]
pub struct Delay(pub Duration);

impl Workload for Delay {
    async fn run(&mut self, _sequence: i64) {
        sleep(self.0).await;
    }
}

/// Critical section whose length is drawn from an exponential distribution,
/// i.e. the gaps of a Poisson process with the given `rate` (events per second).
pub struct Poisson<R: Rng + ?Sized> {
    pub rng: Box<R>,
    pub rate: f64,
}

impl Poisson<SmallRng> {
    pub fn new(rate: f64, seed: &[u8; 32]) -> Self {
        Self {
            rng: Box::new(SmallRng::from_seed(*seed)),
            rate,
        }
    }

    pub fn from_entropy(rate: f64) -> Self {
        Self {
            rng: Box::new(SmallRng::from_rng(&mut rand::rng())),
            rate,
        }
    }

    /// Seconds until the next event.
    pub fn time_for_next_event(&mut self) -> f64 {
        -(1.0f64 - self.rng.random::<f64>()).ln() / self.rate
    }
}

impl Workload for Poisson<SmallRng> {
    async fn run(&mut self, _sequence: i64) {
        let secs = self.time_for_next_event();
        sleep(Duration::from_secs_f64(secs)).await;
    }
}

/// The workloads selectable from the command line.
pub enum Work {
    Fixed(Delay),
    Random(Poisson<SmallRng>),
}

impl Workload for Work {
    async fn run(&mut self, sequence: i64) {
        match self {
            Self::Fixed(delay) => delay.run(sequence).await,
            Self::Random(poisson) => poisson.run(sequence).await,
        }
    }
}
