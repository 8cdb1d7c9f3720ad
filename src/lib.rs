//! Mutual exclusion between two peers with Misra's ping-pong tokens.
//!
//! Two tokens circulate between the peers: the ping (`+n`) and the pong
//! (`-n`). A peer holding both enters its critical section, advances `n` and
//! releases them. A token that comes back alone proves its partner was lost,
//! and the peer that notices regenerates the pair at a higher sequence.

pub use crate::config::*;
pub use crate::error::*;
pub use crate::link::{LineSink, LossySink};
pub use crate::machine::*;
pub use crate::peer::Peer;
pub use crate::scheduler::*;
pub use crate::token::*;
pub use crate::workload::*;

pub mod config;
pub mod error;
pub mod link;
pub mod log;
pub mod machine;
pub mod peer;
pub mod scheduler;
pub mod token;
pub mod workload;
