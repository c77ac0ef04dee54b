//! Data Relay Module
//! 
//! Full-duplex relay between two established connections with idle reclamation.

pub mod connection;
pub mod engine;
pub mod observer;
pub mod session;

pub use connection::{CloseHandle, Connection};
pub use engine::{classify_read_error, pair, pair_with_observer, ReadErrorClass, RelayEngine, MAX_PKT_BUF};
pub use observer::{RelayEvent, RelayObserver, TracingObserver};
pub use session::{Direction, LivenessCounter, PairSession, PairStats};
