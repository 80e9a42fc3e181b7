use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonic sequence numbers for card edits.
///
/// CardKit rejects an edit whose sequence is not greater than the previous
/// one on the same card. One counter per client keeps every edit it issues
/// strictly increasing, across cards and tasks.
#[derive(Debug, Default)]
pub struct Sequence(AtomicI64);

impl Sequence {
    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}
