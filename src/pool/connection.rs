use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// A transport session checked out of (or parked in) a [`Pool`](super::Pool).
///
/// At most one holder owns a `Connection` at a time: the caller between
/// `get` and `put`, or the pool's idle set. Closing drops the transport and
/// is idempotent; a closed connection is never pooled again.
pub struct Connection<C> {
    endpoint: Arc<str>,
    transport: Option<C>,
    last_used: Instant,
}

impl<C> Connection<C> {
    pub(crate) fn new(endpoint: Arc<str>, transport: C) -> Self {
        Self {
            endpoint,
            transport: Some(transport),
            last_used: Instant::now(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The transport handle, or `None` once closed.
    pub fn client(&self) -> Option<&C> {
        self.transport.as_ref()
    }

    pub fn client_mut(&mut self) -> Option<&mut C> {
        self.transport.as_mut()
    }

    /// Tear down the transport. Safe to call more than once.
    pub fn close(&mut self) {
        self.transport.take();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Last time this connection was dialed or checked back in.
    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    pub(crate) fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}

impl<C> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.is_closed())
            .field("last_used", &self.last_used)
            .finish()
    }
}
