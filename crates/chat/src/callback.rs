//! Card button callbacks.

use std::sync::Arc;

use {
    async_trait::async_trait,
    tracing::{debug, info},
};

use {
    streambot_channels::{CardCallback, StaticCard},
    streambot_sessions::SessionStore,
};

use crate::{
    commands::CLEAR_CALLBACK_KIND,
    error::{Error, Result},
    replies::Replies,
};

/// What a callback action decided.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackVerdict {
    /// Replace the pressed card; the chain ends.
    Replace(StaticCard),
    /// Not handled here; try the next action.
    Continue,
    /// Refuse the callback; the chain ends without a card.
    Reject(String),
}

#[async_trait]
pub trait CallbackAction: Send + Sync {
    async fn handle(&self, callback: &CardCallback) -> CallbackVerdict;
}

/// Callback actions evaluated in order.
#[derive(Clone, Default)]
pub struct CallbackChain {
    actions: Vec<Arc<dyn CallbackAction>>,
}

impl CallbackChain {
    pub fn new(actions: Vec<Arc<dyn CallbackAction>>) -> Self {
        Self { actions }
    }

    /// Run the chain and return the replacement card.
    ///
    /// A rejection, or a chain where every action continues, is an error.
    pub async fn run(&self, callback: &CardCallback) -> Result<StaticCard> {
        for action in &self.actions {
            match action.handle(callback).await {
                CallbackVerdict::Replace(card) => return Ok(card),
                CallbackVerdict::Continue => {},
                CallbackVerdict::Reject(reason) => {
                    debug!(kind = %callback.kind, reason = %reason, "card callback rejected");
                    return Err(Error::rejected(reason));
                },
            }
        }
        Err(Error::rejected(format!(
            "no action handled callback kind {}",
            callback.kind
        )))
    }
}

/// Clears the conversation named by a `clear` button.
pub struct ClearCardAction {
    sessions: SessionStore,
    replies: Replies,
}

impl ClearCardAction {
    pub fn new(sessions: SessionStore, replies: Replies) -> Self {
        Self { sessions, replies }
    }
}

#[async_trait]
impl CallbackAction for ClearCardAction {
    async fn handle(&self, callback: &CardCallback) -> CallbackVerdict {
        if callback.kind != CLEAR_CALLBACK_KIND {
            return CallbackVerdict::Reject(format!("unknown callback kind {}", callback.kind));
        }
        self.sessions.clear(&callback.conversation_id);
        info!(
            conversation_id = %callback.conversation_id,
            chat_kind = callback.chat_kind.as_str(),
            "conversation cleared from card"
        );
        CallbackVerdict::Replace(self.replies.cleared())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        serde_json::json,
        streambot_common::ChatMessage,
    };

    fn callback(kind: &str) -> CardCallback {
        CardCallback::from_value(json!({
            "kind": kind,
            "chatType": "group",
            "sessionId": "om_root",
            "msgId": "om_1",
        }))
        .unwrap()
    }

    fn chain(sessions: &SessionStore) -> CallbackChain {
        CallbackChain::new(vec![Arc::new(ClearCardAction::new(
            sessions.clone(),
            Replies::new("DeepSeek"),
        ))])
    }

    #[tokio::test]
    async fn clear_callback_clears_and_replaces_card() {
        let sessions = SessionStore::default();
        sessions.set_messages("om_root", vec![ChatMessage::user("q")]);

        let card = chain(&sessions).run(&callback("clear")).await.unwrap();
        assert_eq!(card, Replies::new("DeepSeek").cleared());
        assert!(sessions.get_messages("om_root").is_empty());
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let sessions = SessionStore::default();
        sessions.set_messages("om_root", vec![ChatMessage::user("q")]);

        let err = chain(&sessions).run(&callback("vote")).await.unwrap_err();
        assert!(matches!(err, Error::CallbackRejected { .. }));
        assert_eq!(sessions.get_messages("om_root").len(), 1);
    }

    struct Pass;

    #[async_trait]
    impl CallbackAction for Pass {
        async fn handle(&self, _callback: &CardCallback) -> CallbackVerdict {
            CallbackVerdict::Continue
        }
    }

    #[tokio::test]
    async fn continue_falls_through_to_next_action() {
        let sessions = SessionStore::default();
        let actions: Vec<Arc<dyn CallbackAction>> = vec![
            Arc::new(Pass),
            Arc::new(ClearCardAction::new(
                sessions.clone(),
                Replies::new("DeepSeek"),
            )),
        ];
        assert!(CallbackChain::new(actions).run(&callback("clear")).await.is_ok());
    }

    #[tokio::test]
    async fn unhandled_callback_is_an_error() {
        let chain = CallbackChain::new(vec![Arc::new(Pass)]);
        assert!(chain.run(&callback("clear")).await.is_err());
        assert!(CallbackChain::default().run(&callback("clear")).await.is_err());
    }
}
