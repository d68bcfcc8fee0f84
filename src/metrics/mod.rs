//! Pool event observers
//!
//! A [`MetricObserver`] is a passive sink: the pool calls it synchronously on
//! every state transition and never reads anything back. Observers are
//! attached to one pool instance at construction, so several pools (or
//! tests) never share counters by accident.

mod counting;
#[cfg(feature = "metrics")]
mod prometheus;

pub use counting::{CountingObserver, MetricSnapshot};
#[cfg(feature = "metrics")]
pub use self::prometheus::PrometheusObserver;

/// One method per countable pool event. Every method defaults to a no-op.
pub trait MetricObserver: Send + Sync {
    /// A connection left the idle set or was dialed for a caller.
    fn inc_used(&self) {}
    fn dec_used(&self) {}
    /// A connection entered the idle set.
    fn inc_idle(&self) {}
    fn dec_idle(&self) {}

    fn inc_dial_refused(&self) {}
    fn inc_dial_timeout(&self) {}
    fn inc_dial_success(&self) {}
    /// Dial failures other than refused and timeout.
    fn inc_dial_error(&self) {}

    /// Served from the idle set; fresh dials are counted by `inc_dial_success`.
    fn inc_get_success(&self) {}
    fn inc_get_empty(&self) {}

    fn inc_put_success(&self) {}
    fn inc_put_full(&self) {}
    /// Caller returned a connection it had already closed.
    fn inc_put_close(&self) {}
    /// Evicted after exceeding the idle timeout.
    fn inc_put_old(&self) {}
    /// Evicted from the peak tier after exceeding the peak timeout.
    fn inc_put_idle(&self) {}
}

/// Observer used when none is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MetricObserver for NoopObserver {}
