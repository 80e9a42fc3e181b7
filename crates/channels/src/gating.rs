use crate::message::{ChatKind, InboundMessage};

/// Whether a message is addressed to the bot.
///
/// Direct chats always are. In a group the message must mention exactly one
/// entity, and that entity's name must equal `bot_name`. Chats of any other
/// kind pass; adapters drop them before admission.
pub fn is_addressed_to_bot(msg: &InboundMessage, bot_name: &str) -> bool {
    match msg.chat_kind {
        ChatKind::Direct | ChatKind::Other => true,
        ChatKind::Group => match msg.mentions.as_slice() {
            [only] => only.name == bot_name,
            _ => false,
        },
    }
}
