use std::time::Duration;

use crate::ttl::TtlCache;

/// Default lifetime of a processed-message marker.
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(10 * 60 * 60);

/// Remembers which inbound message ids were already admitted.
///
/// IM platforms redeliver events they consider unacknowledged; a marker makes
/// admission at-most-once per message id for the marker's lifetime.
#[derive(Debug, Clone)]
pub struct DedupCache {
    seen: TtlCache<String, ()>,
}

impl DedupCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: TtlCache::new(ttl),
        }
    }

    /// Mark `message_id` as processed. Returns `true` the first time only.
    ///
    /// Concurrent calls for one id see exactly one `true`.
    pub fn check_and_mark(&self, message_id: &str) -> bool {
        self.seen.insert_if_absent(message_id.to_string(), ())
    }

    pub fn is_processed(&self, message_id: &str) -> bool {
        self.seen.get(&message_id.to_string()).is_some()
    }

    /// Drop expired markers. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.seen.purge_expired()
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_TTL)
    }
}
