//! Relay Engine
//!
//! Pairs two established connections and copies bytes both ways until one
//! side closes, fails, or the pair goes idle. Idleness is judged per pair,
//! not per direction: both copiers share one liveness counter, so a long
//! one-way transfer keeps the silent direction alive too.

use std::collections::HashMap;
use std::io;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info};

use super::connection::{CloseHandle, Connection};
use super::observer::{RelayEvent, RelayObserver, TracingObserver};
use super::session::{Direction, PairSession, PairStats};

/// Size of the per-copier transfer buffer
pub const MAX_PKT_BUF: usize = 65536;

/// How a failed read is handled by a copier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorClass {
    /// No data arrived before the deadline
    Timeout,
    /// Recoverable condition, retry the read
    Transient,
    /// Peer reset or other unrecoverable failure
    Fatal,
}

/// Classify a read error. Timeouts are checked before transient conditions.
pub fn classify_read_error(err: &io::Error) -> ReadErrorClass {
    match err.kind() {
        io::ErrorKind::TimedOut => ReadErrorClass::Timeout,
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => ReadErrorClass::Transient,
        _ => ReadErrorClass::Fatal,
    }
}

/// Relay `left` and `right` until the pair terminates, logging through `tracing`.
///
/// Returns once both directions have stopped; both connections are closed by then.
pub async fn pair<L, R>(left: Connection<L>, right: Connection<R>, idle_timeout: Duration)
where
    L: AsyncRead + AsyncWrite + Send + 'static,
    R: AsyncRead + AsyncWrite + Send + 'static,
{
    pair_with_observer(left, right, idle_timeout, Arc::new(TracingObserver)).await
}

/// Same as [`pair`], reporting events to `observer`
pub async fn pair_with_observer<L, R>(
    left: Connection<L>,
    right: Connection<R>,
    idle_timeout: Duration,
    observer: Arc<dyn RelayObserver>,
) where
    L: AsyncRead + AsyncWrite + Send + 'static,
    R: AsyncRead + AsyncWrite + Send + 'static,
{
    let session = Arc::new(PairSession::new(
        left.remote_addr().to_string(),
        right.remote_addr().to_string(),
    ));
    run_pair(session, left, right, idle_timeout, observer).await;
}

async fn run_pair<L, R>(
    session: Arc<PairSession>,
    left: Connection<L>,
    right: Connection<R>,
    idle_timeout: Duration,
    observer: Arc<dyn RelayObserver>,
) where
    L: AsyncRead + AsyncWrite + Send + 'static,
    R: AsyncRead + AsyncWrite + Send + 'static,
{
    let (left_stream, left_local, left_remote, left_close) = left.into_parts();
    let (right_stream, right_local, right_remote, right_close) = right.into_parts();
    let (left_reader, left_writer) = tokio::io::split(left_stream);
    let (right_reader, right_writer) = tokio::io::split(right_stream);

    debug!(
        "Starting relay pair {}: {} <=> {} (idle timeout {:?})",
        session.pair_id, left_remote, right_remote, idle_timeout
    );

    let left_to_right = Copier {
        direction: Direction::LeftToRight,
        src: left_reader,
        src_local: left_local.clone(),
        src_remote: left_remote.clone(),
        src_close: left_close.clone(),
        dst: right_writer,
        dst_remote: right_remote.clone(),
        dst_close: right_close.clone(),
        idle_timeout,
        session: Arc::clone(&session),
        observer: Arc::clone(&observer),
    };
    let right_to_left = Copier {
        direction: Direction::RightToLeft,
        src: right_reader,
        src_local: right_local,
        src_remote: right_remote,
        src_close: right_close.clone(),
        dst: left_writer,
        dst_remote: left_remote,
        dst_close: left_close.clone(),
        idle_timeout,
        session: Arc::clone(&session),
        observer: Arc::clone(&observer),
    };

    let handles = [
        (Direction::LeftToRight, tokio::spawn(left_to_right.run())),
        (Direction::RightToLeft, tokio::spawn(right_to_left.run())),
    ];

    for (direction, handle) in handles {
        if let Err(e) = handle.await {
            error!("Copier {} of pair {} failed: {}", direction, session.pair_id, e);
            // A panicked copier skipped its own teardown.
            left_close.close();
            right_close.close();
        }
    }

    observer.on_event(RelayEvent::PairClosed(session.to_stats()));
}

/// One direction of a pair
struct Copier<S, D> {
    direction: Direction,
    src: ReadHalf<S>,
    src_local: String,
    src_remote: String,
    src_close: CloseHandle,
    dst: WriteHalf<D>,
    dst_remote: String,
    dst_close: CloseHandle,
    idle_timeout: Duration,
    session: Arc<PairSession>,
    observer: Arc<dyn RelayObserver>,
}

impl<S, D> Copier<S, D>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    D: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn run(mut self) {
        let mut buf = vec![0u8; MAX_PKT_BUF];

        while self.step(&mut buf).await.is_continue() {}

        // Closing the destination releases the sibling copier, which reads from it.
        self.dst_close.close();
        if let Ok(Err(e)) = timeout(self.idle_timeout, self.dst.shutdown()).await {
            debug!("Shutdown of {} failed: {}", self.dst_remote, e);
        }
    }

    /// One read/forward iteration
    async fn step(&mut self, buf: &mut [u8]) -> ControlFlow<()> {
        let observed_before = self.session.liveness.snapshot();

        let Some(deadline) = Instant::now().checked_add(self.idle_timeout) else {
            self.emit(RelayEvent::DeadlineFailed {
                direction: self.direction,
                source: self.src_remote.clone(),
                idle_timeout: self.idle_timeout,
            });
            return ControlFlow::Break(());
        };

        let read = tokio::select! {
            biased;
            _ = self.src_close.closed() => {
                self.emit(RelayEvent::SourceClosed {
                    direction: self.direction,
                    source: self.src_remote.clone(),
                });
                return ControlFlow::Break(());
            }
            read = timeout_at(deadline, self.src.read(buf)) => read,
        };

        let n = match read {
            Ok(Ok(0)) => {
                self.emit(RelayEvent::PeerClosed {
                    direction: self.direction,
                    source: self.src_remote.clone(),
                });
                return ControlFlow::Break(());
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return self.on_read_error(e, observed_before),
            Err(_elapsed) => return self.on_idle(observed_before),
        };

        self.session.liveness.bump();

        let written = tokio::select! {
            biased;
            _ = self.dst_close.closed() => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "destination connection closed",
            )),
            written = write_chunk(&mut self.dst, &buf[..n]) => written,
        };

        match written {
            Ok(()) => {
                self.session.add_bytes(self.direction, n as u64);
                ControlFlow::Continue(())
            }
            Err(e) => {
                self.emit(RelayEvent::WriteFailed {
                    direction: self.direction,
                    destination: self.dst_remote.clone(),
                    kind: e.kind(),
                    error: e.to_string(),
                });
                ControlFlow::Break(())
            }
        }
    }

    fn on_read_error(&self, e: io::Error, observed_before: u64) -> ControlFlow<()> {
        match classify_read_error(&e) {
            ReadErrorClass::Timeout => self.on_idle(observed_before),
            ReadErrorClass::Transient => {
                self.emit(RelayEvent::TransientRetry {
                    direction: self.direction,
                    source: self.src_remote.clone(),
                    kind: e.kind(),
                    error: e.to_string(),
                });
                ControlFlow::Continue(())
            }
            ReadErrorClass::Fatal => {
                self.emit(RelayEvent::ReadFailed {
                    direction: self.direction,
                    source: self.src_remote.clone(),
                    kind: e.kind(),
                    error: e.to_string(),
                });
                ControlFlow::Break(())
            }
        }
    }

    /// The read deadline passed with no data from this direction's source
    fn on_idle(&self, observed_before: u64) -> ControlFlow<()> {
        if self.session.liveness.changed_since(observed_before) {
            // The other direction moved data during this window.
            return ControlFlow::Continue(());
        }

        self.emit(RelayEvent::StaleDropped {
            direction: self.direction,
            local_addr: self.src_local.clone(),
            remote_addr: self.src_remote.clone(),
        });
        ControlFlow::Break(())
    }

    fn emit(&self, event: RelayEvent) {
        self.observer.on_event(event);
    }
}

async fn write_chunk<W: AsyncWrite + Unpin>(dst: &mut W, chunk: &[u8]) -> io::Result<()> {
    dst.write_all(chunk).await?;
    dst.flush().await
}

/// Membership of one pair in the engine's active map
struct TrackedPair {
    session: Arc<PairSession>,
    active_pairs: Arc<Mutex<HashMap<String, Arc<PairSession>>>>,
}

impl Drop for TrackedPair {
    fn drop(&mut self) {
        let removed = self
            .active_pairs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.session.pair_id)
            .is_some();
        if removed {
            debug!("Removed pair {} from active tracking", self.session.pair_id);
            self.session.log_stats();
        }
    }
}

/// Runs pairs with a fixed idle timeout and tracks the ones in flight
pub struct RelayEngine {
    idle_timeout: Duration,
    observer: Arc<dyn RelayObserver>,
    active_pairs: Arc<Mutex<HashMap<String, Arc<PairSession>>>>,
}

impl RelayEngine {
    /// Create a new relay engine
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(300)) // Default 5 minute idle timeout
    }

    /// Create a new relay engine with custom idle timeout
    pub fn with_timeout(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            observer: Arc::new(TracingObserver),
            active_pairs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a new relay engine from configuration
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::with_timeout(config.relay.idle_timeout)
    }

    /// Replace the event sink
    pub fn with_observer(mut self, observer: Arc<dyn RelayObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Relay a pair to completion, tracking it while it runs
    pub async fn pair<L, R>(&self, left: Connection<L>, right: Connection<R>)
    where
        L: AsyncRead + AsyncWrite + Send + 'static,
        R: AsyncRead + AsyncWrite + Send + 'static,
    {
        let session = Arc::new(PairSession::new(
            left.remote_addr().to_string(),
            right.remote_addr().to_string(),
        ));
        let pair_id = session.pair_id.clone();

        self.sessions().insert(pair_id.clone(), Arc::clone(&session));
        // Untracks the pair even if this future is dropped before the relay ends
        let _tracked = TrackedPair {
            session: Arc::clone(&session),
            active_pairs: Arc::clone(&self.active_pairs),
        };
        info!(
            "Started relay pair {} from {} to {}",
            pair_id, session.left_addr, session.right_addr
        );

        run_pair(
            session,
            left,
            right,
            self.idle_timeout,
            Arc::clone(&self.observer),
        )
        .await;
    }

    /// Get active pair count
    pub fn active_pair_count(&self) -> usize {
        self.sessions().len()
    }

    /// Get pair by ID
    pub fn get_pair(&self, pair_id: &str) -> Option<Arc<PairSession>> {
        self.sessions().get(pair_id).cloned()
    }

    /// Get statistics for all active pairs
    pub fn get_active_pair_stats(&self) -> Vec<PairStats> {
        self.sessions().values().map(|session| session.to_stats()).collect()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<PairSession>>> {
        self.active_pairs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RelayEngine {
    fn default() -> Self {
        Self::new()
    }
}
