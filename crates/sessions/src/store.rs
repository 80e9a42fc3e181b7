use std::time::Duration;

use {streambot_common::ChatMessage, tracing::debug};

use crate::{compaction::compact_history, ttl::TtlCache};

/// Default idle lifetime of a conversation.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Default size budget of one conversation, in JSON bytes.
pub const DEFAULT_MAX_CONTEXT_LEN: usize = 16 * 1024;

/// Conversation id → ordered message history.
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: TtlCache<String, Vec<ChatMessage>>,
    max_context_len: usize,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration, max_context_len: usize) -> Self {
        Self {
            sessions: TtlCache::new(ttl),
            max_context_len,
        }
    }

    /// Stored history, or empty when the conversation is unknown or expired.
    pub fn get_messages(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .get(&conversation_id.to_string())
            .unwrap_or_default()
    }

    /// Replace the history, compacting it when it exceeds the size budget.
    pub fn set_messages(&self, conversation_id: &str, messages: Vec<ChatMessage>) {
        let before = messages.len();
        let messages = compact_history(messages, self.max_context_len);
        if messages.len() != before {
            debug!(
                conversation_id,
                before,
                after = messages.len(),
                "compacted session history"
            );
        }
        self.sessions.insert(conversation_id.to_string(), messages);
    }

    /// Forget the conversation. Returns `true` if it had live history.
    pub fn clear(&self, conversation_id: &str) -> bool {
        self.sessions.remove(&conversation_id.to_string()).is_some()
    }

    /// Drop expired conversations. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.sessions.purge_expired()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL, DEFAULT_MAX_CONTEXT_LEN)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn set_get_clear() {
        let store = SessionStore::default();
        assert!(store.get_messages("c1").is_empty());

        let turn = vec![ChatMessage::user("hello"), ChatMessage::assistant("Hi there")];
        store.set_messages("c1", turn.clone());
        assert_eq!(store.get_messages("c1"), turn);
        assert!(store.get_messages("c2").is_empty());

        assert!(store.clear("c1"));
        assert!(store.get_messages("c1").is_empty());
        assert!(!store.clear("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn write_replaces_history() {
        let store = SessionStore::default();
        store.set_messages("c", vec![ChatMessage::user("one")]);
        store.set_messages("c", vec![ChatMessage::user("two")]);
        assert_eq!(store.get_messages("c"), vec![ChatMessage::user("two")]);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_write_is_compacted() {
        let msgs: Vec<_> = (0..4)
            .map(|i| ChatMessage::user("x".repeat(10 + i)))
            .collect();
        let store = SessionStore::new(DEFAULT_SESSION_TTL, 20);
        store.set_messages("c", msgs.clone());
        assert_eq!(store.get_messages("c"), vec![msgs[0].clone(), msgs[2].clone()]);
    }

    #[tokio::test(start_paused = true)]
    async fn history_expires_when_idle() {
        let store = SessionStore::new(Duration::from_secs(60), DEFAULT_MAX_CONTEXT_LEN);
        store.set_messages("c", vec![ChatMessage::user("hi")]);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.get_messages("c").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_state() {
        let store = SessionStore::default();
        let other = store.clone();
        store.set_messages("c", vec![ChatMessage::user("hi")]);
        assert_eq!(other.get_messages("c").len(), 1);
    }
}
