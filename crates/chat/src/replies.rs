//! Static cards the bot replies with outside of a streaming exchange.

use streambot_channels::{ButtonStyle, CardCallback, HeaderTemplate, InboundMessage, StaticCard};

use crate::commands::CLEAR_CALLBACK_KIND;

/// Builds tip and help cards with the configured assistant name.
#[derive(Debug, Clone)]
pub struct Replies {
    assistant_name: String,
}

impl Replies {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
        }
    }

    fn tip(&self) -> StaticCard {
        StaticCard::new(
            format!("️🆑 {}友情提示", self.assistant_name),
            HeaderTemplate::Grey,
        )
    }

    /// Reply to a message with no text left after normalization.
    pub fn empty_content(&self) -> StaticCard {
        self.tip().note("🤖️：你想知道什么呢~")
    }

    /// Confirmation that a conversation's context was cleared.
    pub fn cleared(&self) -> StaticCard {
        self.tip()
            .note("已清除此话题的上下文信息")
            .note("我们可以开始一个全新的话题，继续找我聊天吧")
    }

    /// Help card with a button that clears the conversation of `msg`.
    pub fn help(&self, msg: &InboundMessage) -> StaticCard {
        let clear = CardCallback {
            kind: CLEAR_CALLBACK_KIND.into(),
            conversation_id: msg.conversation_id.clone(),
            message_id: msg.message_id.clone(),
            chat_kind: msg.chat_kind,
            value: serde_json::Value::Null,
        };
        StaticCard::new("🎒需要帮助吗？", HeaderTemplate::Blue)
            .markdown("**我是您的贴心助手**")
            .divider()
            .markdown_with_button(
                "** 🆑 清除话题上下文**\n文本回复*/clear*",
                "开始新会话",
                clear.to_value(),
                ButtonStyle::Danger,
            )
            .divider()
            .markdown("🎒 **需要更多帮助**\n文本回复 *帮助* 或 */help*")
            .divider()
            .markdown("🎒 **有啥想法反馈，请随时告诉我！**")
    }
}
