//! Text commands handled without an AI call.

use std::sync::Arc;

use {
    async_trait::async_trait,
    tracing::{info, warn},
};

use {
    streambot_channels::{CardReplier, InboundMessage},
    streambot_sessions::SessionStore,
};

use crate::{admission::AdmissionFilter, replies::Replies};

/// Callback kind carried by the help card's "start new session" button.
pub const CLEAR_CALLBACK_KIND: &str = "clear";

const CLEAR_ALIASES: &[&str] = &["/clear", "开始新会话"];
const HELP_ALIASES: &[&str] = &["/help", "帮助"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Clear,
    Help,
}

impl Command {
    /// Match normalized text by prefix against the command aliases.
    pub fn parse(text: &str) -> Option<Self> {
        if CLEAR_ALIASES.iter().any(|a| text.starts_with(a)) {
            Some(Self::Clear)
        } else if HELP_ALIASES.iter().any(|a| text.starts_with(a)) {
            Some(Self::Help)
        } else {
            None
        }
    }
}

/// Executes `/clear` and `/help` and stops the chain for them.
pub struct CommandFilter {
    sessions: SessionStore,
    replier: Arc<dyn CardReplier>,
    replies: Replies,
}

impl CommandFilter {
    pub fn new(sessions: SessionStore, replier: Arc<dyn CardReplier>, replies: Replies) -> Self {
        Self {
            sessions,
            replier,
            replies,
        }
    }
}

#[async_trait]
impl AdmissionFilter for CommandFilter {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn admit(&self, msg: &InboundMessage) -> bool {
        let Some(command) = Command::parse(&msg.text) else {
            return true;
        };
        let card = match command {
            Command::Clear => {
                self.sessions.clear(&msg.conversation_id);
                info!(conversation_id = %msg.conversation_id, "conversation cleared");
                self.replies.cleared()
            },
            Command::Help => self.replies.help(msg),
        };
        if let Err(e) = self.replier.reply_card(&msg.message_id, &card).await {
            warn!(message_id = %msg.message_id, ?command, error = %e, "failed to send command reply");
        }
        false
    }
}
