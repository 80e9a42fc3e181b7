//! Admission pipeline: the ordered filters an inbound message passes before
//! an AI exchange starts.

use std::sync::Arc;

use {
    async_trait::async_trait,
    tracing::{debug, warn},
};

use {
    streambot_channels::{CardReplier, InboundMessage, gating::is_addressed_to_bot},
    streambot_sessions::DedupCache,
};

use crate::replies::Replies;

/// One stage of the admission pipeline.
///
/// Returning `false` stops the chain; a filter that rejects is responsible
/// for any reply the user should see.
#[async_trait]
pub trait AdmissionFilter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn admit(&self, msg: &InboundMessage) -> bool;
}

/// Filters evaluated in order until one rejects.
#[derive(Clone, Default)]
pub struct AdmissionPipeline {
    filters: Vec<Arc<dyn AdmissionFilter>>,
}

impl AdmissionPipeline {
    pub fn new(filters: Vec<Arc<dyn AdmissionFilter>>) -> Self {
        Self { filters }
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every filter in order. Returns whether all of them admitted.
    pub async fn run(&self, msg: &InboundMessage) -> bool {
        for filter in &self.filters {
            if !filter.admit(msg).await {
                debug!(
                    filter = filter.name(),
                    message_id = %msg.message_id,
                    "admission stopped"
                );
                return false;
            }
        }
        true
    }
}

/// Rejects message ids already admitted once.
pub struct DedupFilter {
    cache: DedupCache,
}

impl DedupFilter {
    pub fn new(cache: DedupCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl AdmissionFilter for DedupFilter {
    fn name(&self) -> &'static str {
        "dedup"
    }

    async fn admit(&self, msg: &InboundMessage) -> bool {
        let fresh = self.cache.check_and_mark(&msg.message_id);
        if !fresh {
            debug!(message_id = %msg.message_id, "duplicate message dropped");
        }
        fresh
    }
}

/// In group chats, only messages mentioning the bot alone pass.
pub struct MentionFilter {
    bot_name: String,
}

impl MentionFilter {
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
        }
    }
}

#[async_trait]
impl AdmissionFilter for MentionFilter {
    fn name(&self) -> &'static str {
        "mention"
    }

    async fn admit(&self, msg: &InboundMessage) -> bool {
        is_addressed_to_bot(msg, &self.bot_name)
    }
}

/// Answers messages with no text with a prompt card.
pub struct EmptyContentFilter {
    replier: Arc<dyn CardReplier>,
    replies: Replies,
}

impl EmptyContentFilter {
    pub fn new(replier: Arc<dyn CardReplier>, replies: Replies) -> Self {
        Self { replier, replies }
    }
}

#[async_trait]
impl AdmissionFilter for EmptyContentFilter {
    fn name(&self) -> &'static str {
        "empty_content"
    }

    async fn admit(&self, msg: &InboundMessage) -> bool {
        if !msg.text.is_empty() {
            return true;
        }
        if let Err(e) = self
            .replier
            .reply_card(&msg.message_id, &self.replies.empty_content())
            .await
        {
            warn!(message_id = %msg.message_id, error = %e, "failed to send empty-content reply");
        }
        false
    }
}
