use std::time::Duration;

use chrono_tz::Tz;

/// Engine configuration. Timezone and locale are explicit inputs here, not
/// ambient state; day partitioning and term/holiday checks all use
/// `timezone`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Local calendar timezone for day-boundary computation.
    pub timezone: Tz,
    /// How long a writer may wait for a room's exclusive lock before the
    /// attempt fails as retryable contention.
    pub lock_wait: Duration,
    /// Per-room cap on committed allocations.
    pub max_allocations_per_room: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Tehran,
            lock_wait: Duration::from_secs(5),
            max_allocations_per_room: crate::limits::MAX_ALLOCATIONS_PER_ROOM,
        }
    }
}

impl EngineConfig {
    /// Read configuration from `ROOMLEDGER_*` environment variables, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(tz) = std::env::var("ROOMLEDGER_TIMEZONE")
            && let Ok(parsed) = tz.parse::<Tz>() {
                cfg.timezone = parsed;
            }
        if let Ok(ms) = std::env::var("ROOMLEDGER_LOCK_WAIT_MS")
            && let Ok(parsed) = ms.parse::<u64>() {
                cfg.lock_wait = Duration::from_millis(parsed);
            }
        if let Ok(n) = std::env::var("ROOMLEDGER_MAX_ALLOCATIONS_PER_ROOM")
            && let Ok(parsed) = n.parse::<usize>() {
                cfg.max_allocations_per_room = parsed;
            }
        cfg
    }
}
