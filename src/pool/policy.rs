use serde::Serialize;
use std::time::Duration;

/// Why a returned connection was closed instead of pooled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Eviction {
    /// Unused for longer than the idle timeout.
    Stale,
    /// Above `idle_size` and unused for longer than the peak timeout.
    Peak,
}

/// The three capacity tiers, already clamped to `1 <= init <= idle <= peak`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tiers {
    pub init: usize,
    pub idle: usize,
    pub peak: usize,
}

/// Decide the fate of a connection being returned.
///
/// `idle_count` is the idle-set size including this connection and
/// `idle_for` the time since it was last checked in. The `init` floor is
/// never evicted. Between `init` and `idle` only the idle timeout applies;
/// above `idle` the shorter peak timeout applies as well.
pub(crate) fn judge(
    tiers: Tiers,
    idle_count: usize,
    idle_for: Duration,
    idle_timeout: Duration,
    peak_timeout: Duration,
) -> Option<Eviction> {
    if idle_count <= tiers.init {
        return None;
    }
    if idle_for > idle_timeout {
        return Some(Eviction::Stale);
    }
    if idle_count > tiers.idle && idle_for > peak_timeout {
        return Some(Eviction::Peak);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIERS: Tiers = Tiers {
        init: 1,
        idle: 2,
        peak: 4,
    };
    const IDLE: Duration = Duration::from_secs(10);
    const PEAK: Duration = Duration::from_secs(2);

    #[test]
    fn floor_is_never_evicted() {
        let ancient = Duration::from_secs(3600);
        assert_eq!(judge(TIERS, 1, ancient, IDLE, PEAK), None);
        assert_eq!(judge(TIERS, 0, ancient, IDLE, PEAK), None);
    }

    #[test]
    fn core_tier_uses_idle_timeout() {
        assert_eq!(judge(TIERS, 2, Duration::from_secs(5), IDLE, PEAK), None);
        assert_eq!(judge(TIERS, 2, Duration::from_secs(10), IDLE, PEAK), None);
        assert_eq!(
            judge(TIERS, 2, Duration::from_secs(11), IDLE, PEAK),
            Some(Eviction::Stale)
        );
    }

    #[test]
    fn peak_tier_sheds_faster() {
        assert_eq!(judge(TIERS, 3, Duration::from_secs(1), IDLE, PEAK), None);
        assert_eq!(
            judge(TIERS, 3, Duration::from_secs(3), IDLE, PEAK),
            Some(Eviction::Peak)
        );
        assert_eq!(
            judge(TIERS, 4, Duration::from_secs(30), IDLE, PEAK),
            Some(Eviction::Stale)
        );
    }
}
