//! Bounded pool of connections to a single endpoint
//!
//! Callers pair every successful [`Pool::get`] with exactly one
//! [`Pool::put`]. The idle set is a bounded lock-free queue and the
//! `used`/`idle` counts are independent atomics; no lock is held across a
//! dial, so a slow dial never blocks another caller's idle fast path.
//!
//! Sizing works in three tiers:
//! - `init_size` idle connections are kept forever,
//! - up to `idle_size` idle connections expire after `idle_timeout`,
//! - anything above that (up to `peak_size`) expires after `peak_timeout`.
//!
//! A background task re-applies the same policy once per second so a quiet
//! pool shrinks without waiting for the next `put`.

mod connection;
mod policy;
mod reclaim;
mod state;

pub use connection::Connection;
pub use policy::Eviction;
pub use state::Phase;

use crate::config::PoolConfig;
use crate::dial::{DialError, Dialer, TcpDialer};
use crate::metrics::{MetricObserver, NoopObserver};
use crate::utils::error::{ErrorCode, PoolError, Result};
use chrono::{DateTime, TimeZone, Utc};
use crossbeam_queue::ArrayQueue;
use policy::Tiers;
use state::PoolState;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Result of returning a connection with [`Pool::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// Parked in the idle set.
    Pooled,
    /// Closed by the idle policy.
    Evicted(Eviction),
    /// The caller had already closed it; not pooled.
    AlreadyClosed,
    /// The pool is shutting down; the connection was closed.
    Discarded,
}

impl PutOutcome {
    pub fn code(self) -> ErrorCode {
        match self {
            PutOutcome::Pooled | PutOutcome::Discarded => ErrorCode::Success,
            PutOutcome::Evicted(_) => ErrorCode::PoolIdle,
            PutOutcome::AlreadyClosed => ErrorCode::ConnClosed,
        }
    }
}

/// Pool of [`TcpDialer`] streams.
pub type TcpPool = Pool<TcpDialer>;

pub(crate) struct Shared<D: Dialer> {
    endpoint: Arc<str>,
    tiers: Tiers,
    idle_timeout_secs: AtomicU64,
    peak_timeout_secs: AtomicU64,
    dial_timeout: Duration,
    /// Unix seconds of the last caller get/put
    access_time: AtomicI64,
    state: PoolState,
    queue: ArrayQueue<Connection<D::Conn>>,
    dialer: D,
}

pub struct Pool<D: Dialer> {
    shared: Arc<Shared<D>>,
    shutdown: CancellationToken,
    reclaimer: Mutex<Option<JoinHandle<()>>>,
}

impl Pool<TcpDialer> {
    /// TCP pool built from configuration.
    pub fn from_config(config: PoolConfig) -> Self {
        let dialer = TcpDialer::new(config.nodelay, config.keepalive());
        Self::new(config, dialer)
    }
}

impl<D: Dialer> Pool<D> {
    /// Create a pool without an observer.
    ///
    /// Must be called from within a tokio runtime: the reclamation task is
    /// spawned here and runs until [`Pool::close`] or drop.
    pub fn new(config: PoolConfig, dialer: D) -> Self {
        Self::with_observer(config, dialer, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        config: PoolConfig,
        dialer: D,
        observer: Arc<dyn MetricObserver>,
    ) -> Self {
        let config = config.clamped();
        let tiers = Tiers {
            init: config.init_size,
            idle: config.idle_size,
            peak: config.peak_size,
        };

        let shared = Arc::new(Shared {
            endpoint: Arc::from(config.endpoint.as_str()),
            tiers,
            idle_timeout_secs: AtomicU64::new(config.idle_timeout_secs),
            peak_timeout_secs: AtomicU64::new(config.peak_timeout_secs),
            dial_timeout: config.dial_timeout(),
            access_time: AtomicI64::new(0),
            state: PoolState::new(observer),
            queue: ArrayQueue::new(tiers.peak),
            dialer,
        });

        let shutdown = CancellationToken::new();
        let handle = reclaim::spawn(Arc::clone(&shared), shutdown.clone());

        info!(
            endpoint = %config.endpoint,
            init = tiers.init,
            idle = tiers.idle,
            peak = tiers.peak,
            "Connection pool created"
        );

        Self {
            shared,
            shutdown,
            reclaimer: Mutex::new(Some(handle)),
        }
    }

    /// Check out a connection, dialing with the configured timeout if the
    /// idle set is empty.
    pub async fn get(&self) -> Result<Connection<D::Conn>> {
        self.get_timeout(self.shared.dial_timeout).await
    }

    /// Check out a connection, bounding any dial by `timeout`.
    ///
    /// Never waits for another caller to return a connection: with the idle
    /// set empty and `peak_size` connections out, it fails with `PoolEmpty`.
    /// Dial failures are classified and not retried.
    pub async fn get_timeout(&self, timeout: Duration) -> Result<Connection<D::Conn>> {
        self.shared.touch_access();
        self.shared.get(timeout).await
    }

    /// Return a connection obtained from [`Pool::get`]. Never blocks.
    pub fn put(&self, conn: Connection<D::Conn>) -> Result<PutOutcome> {
        self.shared.touch_access();
        self.shared.put_inner(conn, true)
    }

    /// Shut the pool down: stop the reclamation task, wait for it to exit,
    /// then close every idle connection. Later calls return immediately.
    pub async fn close(&self) {
        if !self.shared.state.begin_shutdown() {
            return;
        }

        self.shutdown.cancel();
        let handle = self.reclaimer.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(
                    "Reclaim task for {} ended abnormally: {}",
                    self.shared.endpoint, e
                );
            }
        }

        let drained = self.shared.drain();
        self.shared.state.finish_shutdown();
        info!(
            "Connection pool for {} closed ({} idle connections closed)",
            self.shared.endpoint, drained
        );
    }

    /// Same as [`Pool::close`].
    pub async fn destroy(&self) {
        self.close().await
    }

    /// Run one reclamation pass now instead of waiting for the next tick.
    /// Returns the number of evicted connections.
    pub fn reclaim_idle(&self) -> usize {
        if !self.shared.state.is_open() {
            return 0;
        }
        reclaim::reclaim_once(&self.shared)
    }

    pub fn set_idle_timeout(&self, timeout: Duration) {
        self.shared
            .idle_timeout_secs
            .store(timeout.as_secs().max(1), Ordering::Relaxed);
    }

    pub fn set_peak_timeout(&self, timeout: Duration) {
        self.shared
            .peak_timeout_secs
            .store(timeout.as_secs().max(1), Ordering::Relaxed);
    }

    pub fn idle_timeout(&self) -> Duration {
        self.shared.idle_timeout()
    }

    pub fn peak_timeout(&self) -> Duration {
        self.shared.peak_timeout()
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Connections currently checked out.
    pub fn used(&self) -> usize {
        self.shared.state.used()
    }

    /// Connections currently in the idle set.
    pub fn idle(&self) -> usize {
        self.shared.state.idle()
    }

    pub fn init_size(&self) -> usize {
        self.shared.tiers.init
    }

    pub fn idle_size(&self) -> usize {
        self.shared.tiers.idle
    }

    pub fn peak_size(&self) -> usize {
        self.shared.tiers.peak
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.phase()
    }

    /// Wall-clock time of the most recent caller `get` or `put`, if any.
    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        match self.shared.access_time.load(Ordering::Relaxed) {
            0 => None,
            secs => Utc.timestamp_opt(secs, 0).single(),
        }
    }
}

impl<D: Dialer> Drop for Pool<D> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<D: Dialer> Shared<D> {
    fn touch_access(&self) {
        self.access_time
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.load(Ordering::Relaxed))
    }

    fn peak_timeout(&self) -> Duration {
        Duration::from_secs(self.peak_timeout_secs.load(Ordering::Relaxed))
    }

    async fn get(&self, timeout: Duration) -> Result<Connection<D::Conn>> {
        if !self.state.is_open() {
            return Err(PoolError::PoolClosed(self.endpoint.to_string()));
        }

        // Reserve first so concurrent callers can never overshoot peak.
        let reservation = self.state.reserve();

        if let Some(conn) = self.queue.pop() {
            self.state.sub_idle();
            self.state.observer().inc_get_success();
            reservation.keep();
            trace!("Reusing pooled connection to {}", self.endpoint);
            return Ok(conn);
        }

        let used = reservation.used();
        if used > self.tiers.peak {
            let used_after = reservation.release();
            self.state.observer().inc_get_empty();
            debug!(
                "Pool for {} is empty (used {}/{}, peak {})",
                self.endpoint, used, used_after, self.tiers.peak
            );
            return Err(PoolError::PoolEmpty {
                endpoint: self.endpoint.to_string(),
                used,
                idle: self.state.idle(),
                init_size: self.tiers.init,
                idle_size: self.tiers.idle,
                peak_size: self.tiers.peak,
            });
        }

        debug!("Pool miss for {}, dialing new connection", self.endpoint);
        let dialed = match tokio::time::timeout(timeout, self.dialer.dial(&self.endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(DialError::Timeout),
        };

        match dialed {
            Ok(transport) => {
                if !self.state.is_open() {
                    reservation.release();
                    return Err(PoolError::PoolClosed(self.endpoint.to_string()));
                }
                reservation.keep();
                self.state.observer().inc_dial_success();
                Ok(Connection::new(Arc::clone(&self.endpoint), transport))
            }
            Err(err) => {
                let used = reservation.release();
                debug!("Dial to {} failed: {}", self.endpoint, err);
                Err(self.classify(err, used))
            }
        }
    }

    fn classify(&self, err: DialError, used: usize) -> PoolError {
        let endpoint = self.endpoint.to_string();
        let observer = self.state.observer();
        match err {
            DialError::Refused(reason) => {
                observer.inc_dial_refused();
                PoolError::ConnUnavailable {
                    endpoint,
                    used,
                    reason,
                }
            }
            DialError::Timeout => {
                observer.inc_dial_timeout();
                PoolError::ConnDeadlineExceeded { endpoint, used }
            }
            DialError::Other(reason) => {
                observer.inc_dial_error();
                PoolError::Transport {
                    endpoint,
                    used,
                    reason,
                }
            }
        }
    }

    /// Take an idle connection without ever dialing. Used by reclamation.
    ///
    /// The reservation is kept only once all bookkeeping is done; if an
    /// observer call panics first, the popped connection is dropped (closed)
    /// and the slot is given back.
    fn take_idle(&self) -> Option<Connection<D::Conn>> {
        let reservation = self.state.reserve();
        let conn = self.queue.pop()?;
        self.state.sub_idle();
        self.state.observer().inc_get_success();
        reservation.keep();
        Some(conn)
    }

    /// Return path shared by callers (`touch = true`) and reclamation
    /// (`touch = false`, so the idle age keeps accumulating).
    fn put_inner(&self, mut conn: Connection<D::Conn>, touch: bool) -> Result<PutOutcome> {
        let used = self.state.sub_used().max(0) as usize;

        if !self.state.is_open() {
            conn.close();
            return Ok(PutOutcome::Discarded);
        }

        if conn.is_closed() {
            self.state.observer().inc_put_close();
            return Ok(PutOutcome::AlreadyClosed);
        }

        let slot = self.state.park();
        let idle = slot.idle();
        let idle_for = conn.last_used().elapsed();
        if touch {
            conn.touch();
        }

        if let Some(eviction) = policy::judge(
            self.tiers,
            idle,
            idle_for,
            self.idle_timeout(),
            self.peak_timeout(),
        ) {
            conn.close();
            slot.release();
            match eviction {
                Eviction::Stale => self.state.observer().inc_put_old(),
                Eviction::Peak => self.state.observer().inc_put_idle(),
            }
            debug!(
                "Evicted {:?} connection to {} (idle {}, unused for {:?})",
                eviction, self.endpoint, idle, idle_for
            );
            return Ok(PutOutcome::Evicted(eviction));
        }

        match self.queue.push(conn) {
            Ok(()) => {
                slot.keep();
                self.state.observer().inc_put_success();
                // Lost a race with close(): whatever was pushed after the drain goes too.
                if !self.state.is_open() {
                    self.drain();
                }
                Ok(PutOutcome::Pooled)
            }
            Err(mut conn) => {
                conn.close();
                slot.release();
                self.state.observer().inc_put_full();
                warn!(
                    "Idle queue for {} is full (used {}, peak {}); closing connection",
                    self.endpoint, used, self.tiers.peak
                );
                Err(PoolError::PoolFull {
                    endpoint: self.endpoint.to_string(),
                    used,
                    peak_size: self.tiers.peak,
                })
            }
        }
    }

    /// Close everything in the idle set. Returns how many were closed.
    fn drain(&self) -> usize {
        let mut drained = 0;
        while let Some(mut conn) = self.queue.pop() {
            self.state.sub_idle();
            conn.close();
            drained += 1;
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingDialer {
        dials: AtomicUsize,
    }

    #[async_trait]
    impl Dialer for CountingDialer {
        type Conn = usize;

        async fn dial(&self, _endpoint: &str) -> std::result::Result<usize, DialError> {
            Ok(self.dials.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn pool(init: usize, idle: usize, peak: usize) -> Pool<CountingDialer> {
        Pool::new(
            PoolConfig::new("test:1", init, idle, peak),
            CountingDialer {
                dials: AtomicUsize::new(0),
            },
        )
    }

    #[tokio::test]
    async fn put_outcome_codes() {
        assert_eq!(PutOutcome::Pooled.code(), ErrorCode::Success);
        assert_eq!(PutOutcome::Discarded.code(), ErrorCode::Success);
        assert_eq!(PutOutcome::Evicted(Eviction::Peak).code(), ErrorCode::PoolIdle);
        assert_eq!(PutOutcome::AlreadyClosed.code(), ErrorCode::ConnClosed);
    }

    #[tokio::test]
    async fn full_queue_closes_instead_of_pooling() {
        let pool = pool(1, 1, 1);
        let conn = pool.get().await.unwrap();
        assert_eq!(pool.put(conn).unwrap(), PutOutcome::Pooled);

        // Forge a second checked-out connection behind admission's back.
        pool.shared.state.reserve().keep();
        let extra = Connection::new(Arc::from("test:1"), 99usize);
        let err = pool.put(extra).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PoolFull);
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.used(), 0);
    }

    #[tokio::test]
    async fn take_idle_releases_reservation_on_empty_queue() {
        let pool = pool(1, 2, 3);
        assert!(pool.shared.take_idle().is_none());
        assert_eq!(pool.used(), 0);
    }

    #[tokio::test]
    async fn last_access_is_recorded() {
        let pool = pool(1, 2, 3);
        assert!(pool.last_access().is_none());
        let conn = pool.get().await.unwrap();
        assert!(pool.last_access().is_some());
        pool.put(conn).unwrap();
    }

    #[tokio::test]
    async fn timeouts_are_clamped_to_one_second() {
        let pool = pool(1, 2, 3);
        assert_eq!(pool.idle_timeout(), Duration::from_secs(10));
        assert_eq!(pool.peak_timeout(), Duration::from_secs(2));

        pool.set_idle_timeout(Duration::from_millis(10));
        pool.set_peak_timeout(Duration::from_secs(5));
        assert_eq!(pool.idle_timeout(), Duration::from_secs(1));
        assert_eq!(pool.peak_timeout(), Duration::from_secs(5));
    }
}
