//! Relay Connections
//!
//! A [`Connection`] is one already-established leg of a pair: any async byte
//! stream plus the endpoint labels used in diagnostics, and a [`CloseHandle`]
//! shared by everything that needs to tear it down.

use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::watch;

/// Idempotent close signal for a single connection
///
/// Clones observe and drive the same state. Closing wakes every task parked
/// in [`CloseHandle::closed`], which is how a copier blocked on a read is
/// released when its sibling gives up on the pair.
#[derive(Clone)]
pub struct CloseHandle {
    state: Arc<watch::Sender<bool>>,
}

impl CloseHandle {
    /// Create an open handle
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Close the connection. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        !self.state.send_replace(true)
    }

    /// Whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once the connection is closed
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for CloseHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One leg of a relay pair
pub struct Connection<S> {
    stream: S,
    local_addr: String,
    remote_addr: String,
    close: CloseHandle,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap an arbitrary stream with endpoint labels
    pub fn new(stream: S, local_addr: impl fmt::Display, remote_addr: impl fmt::Display) -> Self {
        Self {
            stream,
            local_addr: local_addr.to_string(),
            remote_addr: remote_addr.to_string(),
            close: CloseHandle::new(),
        }
    }

    /// Handle that closes this connection, usable before and after pairing
    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub(crate) fn into_parts(self) -> (S, String, String, CloseHandle) {
        (self.stream, self.local_addr, self.remote_addr, self.close)
    }
}

impl Connection<TcpStream> {
    /// Wrap a connected TCP stream, labelling it with its socket addresses
    pub fn from_tcp(stream: TcpStream) -> std::io::Result<Self> {
        let local_addr = stream.local_addr()?;
        let remote_addr = stream.peer_addr()?;
        Ok(Self::new(stream, local_addr, remote_addr))
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("local_addr", &self.local_addr)
            .field("remote_addr", &self.remote_addr)
            .field("closed", &self.close.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_close_is_idempotent() {
        let handle = CloseHandle::new();
        assert!(!handle.is_closed());

        assert!(handle.close());
        assert!(handle.is_closed());

        // Second close is a no-op
        assert!(!handle.close());
        assert!(handle.clone().is_closed());
    }

    #[tokio::test]
    async fn test_closed_wakes_waiter() {
        let handle = CloseHandle::new();
        let waiter = handle.clone();

        let task = tokio::spawn(async move { waiter.closed().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_finished());

        handle.close();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter should be released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_closed_resolves_when_already_closed() {
        let handle = CloseHandle::new();
        handle.close();
        tokio::time::timeout(Duration::from_millis(100), handle.closed())
            .await
            .expect("already closed handle should resolve immediately");
    }

    #[tokio::test]
    async fn test_connection_labels() {
        let (a, _b) = tokio::io::duplex(64);
        let conn = Connection::new(a, "10.0.0.1:1000", "10.0.0.2:2000");
        assert_eq!(conn.local_addr(), "10.0.0.1:1000");
        assert_eq!(conn.remote_addr(), "10.0.0.2:2000");
        assert!(!conn.close_handle().is_closed());
    }
}
