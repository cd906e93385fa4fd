//! The server keyspace: two dicts, `data` and `expire`, with lazy and
//! active (cron) expiration. Grounded on `original_source/redis.go`'s
//! `redisDB`/`expireIfNeeded`/`ServerCron`.

use crate::dict::Dict;
use crate::value::Value;

/// `data` (key -> value) and `expire` (key -> absolute deadline in ms).
///
/// Invariant (per `spec.md` §3): every key present in `expire` is present in
/// `data`; the reverse is not required.
#[derive(Debug, Default)]
pub struct Keyspace {
    pub data: Dict,
    pub expire: Dict,
}

impl Keyspace {
    /// An empty keyspace.
    pub fn new() -> Self {
        Keyspace {
            data: Dict::new(),
            expire: Dict::new(),
        }
    }

    /// If `key` has a deadline in `expire` that has passed, delete it from
    /// both dicts. Returns whether the key was expired away. Every read
    /// path calls this before consulting `data` (lazy expiration,
    /// `spec.md` §4.5).
    pub fn expire_if_needed(&mut self, key: &Value, now_ms: i64) -> bool {
        let deadline = match self.expire.find(key) {
            Some(entry) => entry.val.as_int(),
            None => return false,
        };
        let Some(deadline) = deadline else { return false };
        if deadline > now_ms {
            return false;
        }
        let _ = self.expire.delete(key);
        let _ = self.data.delete(key);
        metrics::counter!("kvd_keys_expired_total", "mechanism" => "lazy").increment(1);
        true
    }

    /// Lazily expire `key`, then look it up in `data`.
    pub fn get(&mut self, key: &Value, now_ms: i64) -> Option<&Value> {
        self.expire_if_needed(key, now_ms);
        self.data.get(key)
    }

    /// `data[key] <- val`; clears any prior expiry (`spec.md` §4.4's `set`).
    pub fn set(&mut self, key: Value, val: Value) {
        let _ = self.expire.delete(&key);
        self.data.set(key, val);
    }

    /// `expire[key] <- at_ms`. The key need not already exist in `data`.
    pub fn set_expire_at(&mut self, key: Value, at_ms: i64) {
        self.expire.set(key, Value::from_int(at_ms));
    }

    /// Active expiration: sample up to `max_samples` random entries from
    /// `expire`; delete any whose deadline has passed from both dicts;
    /// stop early if a sample comes back empty. Returns the number of keys
    /// expired this sweep.
    pub fn cron_sweep(&mut self, now_ms: i64, max_samples: usize) -> usize {
        let mut expired = 0;
        for _ in 0..max_samples {
            let Some((key, deadline)) = self.expire.random_entry() else {
                break;
            };
            let key = key.to_owned_str();
            let Some(deadline) = deadline.as_int() else {
                continue;
            };
            if deadline <= now_ms {
                let _ = self.expire.delete(&key);
                let _ = self.data.delete(&key);
                expired += 1;
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::str(v.to_string())
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut ks = Keyspace::new();
        ks.set(s("foo"), s("bar"));
        assert_eq!(ks.get(&s("foo"), 0), Some(&s("bar")));
    }

    #[test]
    fn expire_in_the_past_lazily_deletes_on_read() {
        let mut ks = Keyspace::new();
        ks.set(s("k"), s("v"));
        ks.set_expire_at(s("k"), 0);
        assert_eq!(ks.get(&s("k"), 1000), None);
        assert!(!ks.data.contains_key(&s("k")));
    }

    #[test]
    fn set_clears_prior_expiry() {
        let mut ks = Keyspace::new();
        ks.set(s("k"), s("v1"));
        ks.set_expire_at(s("k"), 1_000_000);
        ks.set(s("k"), s("v2"));
        assert!(!ks.expire.contains_key(&s("k")));
    }

    #[test]
    fn expire_can_be_set_on_a_missing_key() {
        let mut ks = Keyspace::new();
        ks.set_expire_at(s("ghost"), 5000);
        assert!(ks.expire.contains_key(&s("ghost")));
        assert!(!ks.data.contains_key(&s("ghost")));
    }

    #[test]
    fn cron_sweep_removes_past_deadlines_only() {
        let mut ks = Keyspace::new();
        ks.set(s("expired"), s("v"));
        ks.set_expire_at(s("expired"), 0);
        ks.set(s("fresh"), s("v"));
        ks.set_expire_at(s("fresh"), 1_000_000_000);

        let removed = ks.cron_sweep(500, 100);
        assert_eq!(removed, 1);
        assert!(!ks.data.contains_key(&s("expired")));
        assert!(ks.data.contains_key(&s("fresh")));
    }

    #[test]
    fn cron_sweep_stops_early_on_empty_expire_dict() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.cron_sweep(0, 100), 0);
    }
}
