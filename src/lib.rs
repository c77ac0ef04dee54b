//! Connpair Library
//! 
//! Full-duplex relay between two already-established byte streams, with
//! automatic reclamation of pairs that go idle in both directions.

pub mod config;
pub mod psk;
pub mod relay;

pub use config::Config;
pub use relay::{pair, pair_with_observer, Connection, RelayEngine};

/// Common error type for the crate
pub type Result<T> = anyhow::Result<T>;
