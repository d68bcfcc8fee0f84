use crate::metrics::MetricObserver;
use std::sync::atomic::{AtomicIsize, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of a pool. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Open = 0,
    ShuttingDown = 1,
    Closed = 2,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Phase::Open,
            1 => Phase::ShuttingDown,
            _ => Phase::Closed,
        }
    }
}

/// Shared counters of a pool.
///
/// `used` and `idle` are updated independently with fetch-add, so a reader
/// racing a get/put may observe a value one step behind. Every update is
/// mirrored to the observer.
pub(crate) struct PoolState {
    used: AtomicIsize,
    idle: AtomicIsize,
    phase: AtomicU8,
    observer: Arc<dyn MetricObserver>,
}

impl PoolState {
    pub(crate) fn new(observer: Arc<dyn MetricObserver>) -> Self {
        Self {
            used: AtomicIsize::new(0),
            idle: AtomicIsize::new(0),
            phase: AtomicU8::new(Phase::Open as u8),
            observer,
        }
    }

    pub(crate) fn observer(&self) -> &dyn MetricObserver {
        self.observer.as_ref()
    }

    // Counters move before the observer is told, so a panicking observer
    // cannot leave them out of step with the connections they describe.

    pub(crate) fn sub_used(&self) -> isize {
        let used = self.used.fetch_sub(1, Ordering::AcqRel) - 1;
        self.observer.dec_used();
        used
    }

    pub(crate) fn sub_idle(&self) -> isize {
        let idle = self.idle.fetch_sub(1, Ordering::AcqRel) - 1;
        self.observer.dec_idle();
        idle
    }

    /// Undo from a guard's drop. While unwinding the observer is skipped:
    /// a second panic there would abort the process.
    fn rollback(&self, counter: &AtomicIsize, notify: fn(&dyn MetricObserver)) {
        counter.fetch_sub(1, Ordering::AcqRel);
        if !std::thread::panicking() {
            notify(self.observer.as_ref());
        }
    }

    pub(crate) fn used(&self) -> usize {
        self.used.load(Ordering::Acquire).max(0) as usize
    }

    pub(crate) fn idle(&self) -> usize {
        self.idle.load(Ordering::Acquire).max(0) as usize
    }

    pub(crate) fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn is_open(&self) -> bool {
        self.phase() == Phase::Open
    }

    /// Open -> ShuttingDown. Only the first caller gets `true`.
    pub(crate) fn begin_shutdown(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Open as u8,
                Phase::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn finish_shutdown(&self) {
        self.phase.store(Phase::Closed as u8, Ordering::Release);
    }

    /// Take an admission slot that is released on drop unless kept.
    pub(crate) fn reserve(&self) -> Reservation<'_> {
        let reservation = Reservation {
            state: self,
            used: self.used.fetch_add(1, Ordering::AcqRel) + 1,
            armed: true,
        };
        self.observer.inc_used();
        reservation
    }

    /// Count a connection into the idle set. The count is taken back on drop
    /// unless the connection actually lands in the queue.
    pub(crate) fn park(&self) -> IdleSlot<'_> {
        let slot = IdleSlot {
            state: self,
            idle: self.idle.fetch_add(1, Ordering::AcqRel) + 1,
            armed: true,
        };
        self.observer.inc_idle();
        slot
    }
}

/// One provisional `used` slot.
///
/// Dropping it (an error return, the caller abandoning a `get` future
/// mid-dial, or a panic) gives the slot back.
pub(crate) struct Reservation<'a> {
    state: &'a PoolState,
    used: isize,
    armed: bool,
}

impl Reservation<'_> {
    /// `used` as observed right after this reservation was taken.
    pub(crate) fn used(&self) -> usize {
        self.used.max(0) as usize
    }

    /// The slot now belongs to a checked-out connection.
    pub(crate) fn keep(mut self) {
        self.armed = false;
    }

    /// Give the slot back now, returning the new `used` count.
    pub(crate) fn release(mut self) -> usize {
        self.armed = false;
        self.state.sub_used().max(0) as usize
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state
                .rollback(&self.state.used, |observer| observer.dec_used());
        }
    }
}

/// One provisional `idle` count for a connection on its way into the queue.
pub(crate) struct IdleSlot<'a> {
    state: &'a PoolState,
    idle: isize,
    armed: bool,
}

impl IdleSlot<'_> {
    /// `idle` as observed right after this slot was taken.
    pub(crate) fn idle(&self) -> usize {
        self.idle.max(0) as usize
    }

    /// The connection is in the queue.
    pub(crate) fn keep(mut self) {
        self.armed = false;
    }

    /// The connection was closed instead of queued.
    pub(crate) fn release(mut self) {
        self.armed = false;
        self.state.sub_idle();
    }
}

impl Drop for IdleSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state
                .rollback(&self.state.idle, |observer| observer.dec_idle());
        }
    }
}
