//! In-memory conversation state.
//!
//! Conversations are kept as ordered [`ChatMessage`] histories keyed by
//! conversation id, expire after an idle TTL, and are compacted when their
//! serialized size exceeds the configured budget. The dedup cache remembers
//! which inbound message ids were already admitted.

pub mod compaction;
pub mod dedup;
pub mod store;
pub mod ttl;

pub use {
    compaction::compact_history,
    dedup::DedupCache,
    store::SessionStore,
    streambot_common::ChatMessage,
    ttl::TtlCache,
};
