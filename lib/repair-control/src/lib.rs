//! # Distributed repair control
//!
//! Runs `num_comps` demes of the genetic search side by side. Demes share
//! nothing mutable: after every `gen_per_exchange` generations each one
//! emits its best variants as a wire message, the coordinator rotates the
//! messages one position around the ring, and every deme seeds its next
//! span from the decoded incomers plus its retained incumbents.
//!
//! The [`environment`] module owns process-level concerns (logging
//! formats, levels and output locations) for whatever binary drives the
//! engine.

pub mod environment;
pub mod exchange;

mod coordinator;
mod error;

pub use self::{
    coordinator::{DistributedConfig, DistributedCoordinator, DistributedOutcome},
    error::{Error, Result},
};
