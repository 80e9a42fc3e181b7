use std::{
    hash::Hash,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    dashmap::{DashMap, mapref::entry::Entry},
    tokio::time::Instant,
};

/// Sweep expired entries once every this many writes.
const CLEANUP_EVERY_WRITES: u64 = 512;

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent map whose entries expire a fixed duration after their last write.
///
/// Expired entries are invisible to reads immediately and are physically
/// removed lazily on access plus a periodic sweep.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    ttl: Duration,
    entries: Arc<DashMap<K, Slot<V>>>,
    writes_seen: Arc<AtomicU64>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(DashMap::new()),
            writes_seen: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current value, if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(slot) = self.entries.get(key) {
            if slot.expires_at > now {
                return Some(slot.value.clone());
            }
        } else {
            return None;
        }
        self.entries.remove_if(key, |_, slot| slot.expires_at <= now);
        None
    }

    /// Insert or replace, restarting the entry's lifetime.
    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        self.entries.insert(key, Slot {
            value,
            expires_at: now + self.ttl,
        });
        self.cleanup_if_needed(now);
    }

    /// Insert only when no live entry exists. Returns `true` if inserted.
    ///
    /// The check and the write happen under the same shard lock.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let now = Instant::now();
        let inserted = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expires_at > now {
                    false
                } else {
                    occupied.insert(Slot {
                        value,
                        expires_at: now + self.ttl,
                    });
                    true
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value,
                    expires_at: now + self.ttl,
                });
                true
            },
        };
        self.cleanup_if_needed(now);
        inserted
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .filter(|(_, slot)| slot.expires_at > now)
            .map(|(_, slot)| slot.value)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cleanup_if_needed(&self, now: Instant) {
        let seen = self.writes_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if !seen.is_multiple_of(CLEANUP_EVERY_WRITES) {
            return;
        }
        self.entries.retain(|_, slot| slot.expires_at > now);
    }
}
