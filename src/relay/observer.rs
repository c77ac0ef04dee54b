//! Relay Observability
//!
//! The relay never returns errors; everything it has to say about a pair
//! goes through a [`RelayObserver`]. [`TracingObserver`] is the default sink.

use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::session::{Direction, PairStats};

/// Diagnostic events emitted while relaying a pair
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// The read deadline for `source` could not be armed
    DeadlineFailed {
        direction: Direction,
        source: String,
        idle_timeout: Duration,
    },
    /// Neither direction moved data for a full idle window
    StaleDropped {
        direction: Direction,
        local_addr: String,
        remote_addr: String,
    },
    /// A recoverable read error; the copier retries
    TransientRetry {
        direction: Direction,
        source: String,
        kind: io::ErrorKind,
        error: String,
    },
    /// The remote end of `source` finished sending (EOF)
    PeerClosed { direction: Direction, source: String },
    /// `source` was closed locally, by the sibling copier or by the caller
    SourceClosed { direction: Direction, source: String },
    /// Unrecoverable read error
    ReadFailed {
        direction: Direction,
        source: String,
        kind: io::ErrorKind,
        error: String,
    },
    /// Write to `destination` failed or the destination was closed mid-write
    WriteFailed {
        direction: Direction,
        destination: String,
        kind: io::ErrorKind,
        error: String,
    },
    /// Both copiers have finished and both connections are closed
    PairClosed(PairStats),
}

impl RelayEvent {
    /// Direction the event originated from, if it belongs to a single copier
    pub fn direction(&self) -> Option<Direction> {
        match self {
            RelayEvent::DeadlineFailed { direction, .. }
            | RelayEvent::StaleDropped { direction, .. }
            | RelayEvent::TransientRetry { direction, .. }
            | RelayEvent::PeerClosed { direction, .. }
            | RelayEvent::SourceClosed { direction, .. }
            | RelayEvent::ReadFailed { direction, .. }
            | RelayEvent::WriteFailed { direction, .. } => Some(*direction),
            RelayEvent::PairClosed(_) => None,
        }
    }
}

/// Sink for relay events
pub trait RelayObserver: Send + Sync + 'static {
    fn on_event(&self, event: RelayEvent);
}

/// Default observer writing every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RelayObserver for TracingObserver {
    fn on_event(&self, event: RelayEvent) {
        match event {
            RelayEvent::DeadlineFailed { direction, source, idle_timeout } => {
                warn!(%direction, "Can't update deadline for connection {} (idle timeout {:?})", source, idle_timeout);
            }
            RelayEvent::StaleDropped { direction, local_addr, remote_addr } => {
                info!(%direction, "Dropping stale connection {} <=> {}", local_addr, remote_addr);
            }
            RelayEvent::TransientRetry { direction, source, error, .. } => {
                debug!(%direction, "Ignoring temporary error during read from {}: {}", source, error);
            }
            RelayEvent::PeerClosed { direction, source } => {
                debug!(%direction, "Read from {} reached end of stream", source);
            }
            RelayEvent::SourceClosed { direction, source } => {
                debug!(%direction, "Connection {} closed, stopping copier", source);
            }
            RelayEvent::ReadFailed { direction, source, error, .. } => {
                warn!(%direction, "Read from {} error: {}", source, error);
            }
            RelayEvent::WriteFailed { direction, destination, error, .. } => {
                warn!(%direction, "Write to {} error: {}", destination, error);
            }
            RelayEvent::PairClosed(stats) => {
                info!(
                    pair_id = %stats.pair_id,
                    duration_ms = stats.duration_ms,
                    bytes_left_to_right = stats.bytes_left_to_right,
                    bytes_right_to_left = stats.bytes_right_to_left,
                    activity = stats.activity,
                    "Relay pair {} <=> {} closed",
                    stats.left_addr,
                    stats.right_addr
                );
            }
        }
    }
}
