//! Monotonic millisecond timestamp source used by the event loop, the
//! expiry index, and the cron sampler.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time, in milliseconds since the Unix epoch.
///
/// The keyspace stores expiry deadlines in this unit; both the lazy and the
/// active expiration paths compare against it so the cron sampler's
/// decisions agree with reads (see the open question in `spec.md` §9 about
/// the original's seconds/milliseconds mismatch, which this implementation
/// does not reproduce).
pub fn now_ms() -> i64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as i64
}
