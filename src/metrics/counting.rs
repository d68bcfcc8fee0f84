use super::MetricObserver;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Point-in-time copy of a [`CountingObserver`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub used: i64,
    pub idle: i64,

    pub dial_refused: u64,
    pub dial_timeout: u64,
    pub dial_success: u64,
    pub dial_error: u64,

    pub get_success: u64,
    pub get_empty: u64,
    pub put_success: u64,
    pub put_full: u64,
    pub put_close: u64,
    pub put_old: u64,
    pub put_idle: u64,
}

/// Accumulates pool events in atomics.
///
/// Event counters can be drained with the `zero_*` family, which returns the
/// value held before the reset. That suits a telemetry loop sampling once
/// per period. The `used`/`idle` gauges are never reset.
#[derive(Debug, Default)]
pub struct CountingObserver {
    used: AtomicI64,
    idle: AtomicI64,

    dial_refused: AtomicU64,
    dial_timeout: AtomicU64,
    dial_success: AtomicU64,
    dial_error: AtomicU64,

    get_success: AtomicU64,
    get_empty: AtomicU64,
    put_success: AtomicU64,
    put_full: AtomicU64,
    put_close: AtomicU64,
    put_old: AtomicU64,
    put_idle: AtomicU64,
}

macro_rules! zero_counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $name(&self) -> u64 {
                self.$field.swap(0, Ordering::Relaxed)
            }
        )*
    };
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn used(&self) -> i64 {
        self.used.load(Ordering::Relaxed)
    }

    pub fn idle(&self) -> i64 {
        self.idle.load(Ordering::Relaxed)
    }

    zero_counter! {
        zero_dial_refused => dial_refused,
        zero_dial_timeout => dial_timeout,
        zero_dial_success => dial_success,
        zero_dial_error => dial_error,
        zero_get_success => get_success,
        zero_get_empty => get_empty,
        zero_put_success => put_success,
        zero_put_full => put_full,
        zero_put_close => put_close,
        zero_put_old => put_old,
        zero_put_idle => put_idle,
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            used: self.used(),
            idle: self.idle(),
            dial_refused: self.dial_refused.load(Ordering::Relaxed),
            dial_timeout: self.dial_timeout.load(Ordering::Relaxed),
            dial_success: self.dial_success.load(Ordering::Relaxed),
            dial_error: self.dial_error.load(Ordering::Relaxed),
            get_success: self.get_success.load(Ordering::Relaxed),
            get_empty: self.get_empty.load(Ordering::Relaxed),
            put_success: self.put_success.load(Ordering::Relaxed),
            put_full: self.put_full.load(Ordering::Relaxed),
            put_close: self.put_close.load(Ordering::Relaxed),
            put_old: self.put_old.load(Ordering::Relaxed),
            put_idle: self.put_idle.load(Ordering::Relaxed),
        }
    }
}

impl MetricObserver for CountingObserver {
    fn inc_used(&self) {
        self.used.fetch_add(1, Ordering::Relaxed);
    }

    fn dec_used(&self) {
        self.used.fetch_sub(1, Ordering::Relaxed);
    }

    fn inc_idle(&self) {
        self.idle.fetch_add(1, Ordering::Relaxed);
    }

    fn dec_idle(&self) {
        self.idle.fetch_sub(1, Ordering::Relaxed);
    }

    fn inc_dial_refused(&self) {
        self.dial_refused.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_dial_timeout(&self) {
        self.dial_timeout.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_dial_success(&self) {
        self.dial_success.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_dial_error(&self) {
        self.dial_error.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_get_success(&self) {
        self.get_success.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_get_empty(&self) {
        self.get_empty.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_put_success(&self) {
        self.put_success.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_put_full(&self) {
        self.put_full.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_put_close(&self) {
        self.put_close.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_put_old(&self) {
        self.put_old.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_put_idle(&self) {
        self.put_idle.fetch_add(1, Ordering::Relaxed);
    }
}
