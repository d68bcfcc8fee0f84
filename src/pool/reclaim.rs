//! Background reclamation of stale idle connections.

use super::{PutOutcome, Shared};
use crate::dial::Dialer;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub(crate) const RECLAIM_INTERVAL: Duration = Duration::from_secs(1);

/// Start the per-pool reclamation loop. It exits when `shutdown` fires.
pub(crate) fn spawn<D: Dialer>(
    shared: Arc<Shared<D>>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RECLAIM_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            if !shared.state.is_open() {
                break;
            }

            let evicted = reclaim_once(&shared);
            if evicted > 0 {
                debug!(
                    "Reclaimed {} idle connections to {} (idle now {})",
                    evicted,
                    shared.endpoint,
                    shared.state.idle()
                );
            }
        }

        trace!("Reclaim task for {} stopped", shared.endpoint);
    })
}

/// One reclamation pass. Returns the number of evicted connections.
///
/// Runs only when the idle set is above the floor and fewer connections are
/// checked out than idle. Each idle connection is taken without dialing and
/// returned without refreshing its timestamp, so the regular eviction policy
/// sees its true idle age. The pass stops at the first connection that is
/// kept, or when the queue is empty. A panic costs only the connection it
/// happened on.
pub(crate) fn reclaim_once<D: Dialer>(shared: &Shared<D>) -> usize {
    let idle = shared.state.idle();
    let used = shared.state.used();
    if idle <= shared.tiers.init || used >= idle {
        return 0;
    }

    let mut evicted = 0;
    for _ in 0..idle {
        // A panic anywhere in the step drops the connection in hand, which
        // closes it; the reservation and idle-slot guards undo the counters.
        let step = panic::catch_unwind(AssertUnwindSafe(|| {
            shared
                .take_idle()
                .map(|conn| shared.put_inner(conn, false))
        }));
        match step {
            Ok(Some(Ok(PutOutcome::Evicted(_)))) => evicted += 1,
            Ok(_) => break,
            Err(_) => {
                warn!(
                    "Reclaim of an idle connection to {} panicked; connection closed",
                    shared.endpoint
                );
            }
        }
    }

    evicted
}
