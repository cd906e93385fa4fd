//! Active expiration: the periodic cron sampler.
//!
//! Grounded on `original_source/redis.go`'s `ServerCron`, with the
//! milliseconds-vs-seconds unit mismatch noted in `spec.md` §9 fixed: the
//! comparison here uses milliseconds throughout, matching the lazy path.

use kvd_core::Keyspace;

/// Entries sampled from `expire` per cron tick.
pub const SAMPLES_PER_TICK: usize = 100;

/// Run one active-expiration sweep and record how many keys it removed.
pub fn tick(keyspace: &mut Keyspace, now_ms: i64) {
    let expired = keyspace.cron_sweep(now_ms, SAMPLES_PER_TICK);
    if expired > 0 {
        metrics::counter!("kvd_keys_expired_total", "mechanism" => "cron")
            .increment(expired as u64);
    }
}
