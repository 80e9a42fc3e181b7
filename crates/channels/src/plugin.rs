use async_trait::async_trait;

use crate::{
    Result,
    card::{StaticCard, StreamUpdate},
};

/// Editable streaming cards on an IM platform.
#[async_trait]
pub trait CardSink: Send + Sync {
    /// Create an empty card in streaming mode and return its id.
    async fn create_card(&self) -> Result<String>;

    /// Post the card as a reply to `message_id`.
    async fn post_card_reply(&self, message_id: &str, card_id: &str) -> Result<()>;

    /// Replace the non-empty fields of `update` on the card. An update with
    /// every field empty is a no-op.
    async fn update_card_content(&self, card_id: &str, update: &StreamUpdate) -> Result<()>;

    /// Switch the card out of streaming mode; no further edits follow.
    async fn finalize_card(&self, card_id: &str) -> Result<()>;
}

/// Direct replies with static cards.
#[async_trait]
pub trait CardReplier: Send + Sync {
    async fn reply_card(&self, message_id: &str, card: &StaticCard) -> Result<()>;
}
