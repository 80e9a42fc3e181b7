use serde::{Deserialize, Serialize};

/// Kind of chat a message was posted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Group,
    /// One-to-one chat with the bot.
    #[serde(rename = "personal")]
    Direct,
    Other,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Direct => "personal",
            Self::Other => "other",
        }
    }
}

/// An entity @-mentioned in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Display name as rendered in the chat.
    pub name: String,
    /// Platform id of the mentioned entity, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A platform message reduced to what the admission pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Thread identity: the root message id, else the message's own id.
    pub conversation_id: String,
    pub message_id: String,
    pub chat_id: String,
    pub chat_kind: ChatKind,
    pub sender_id: String,
    /// Plain text with markup and `@mention` tokens removed, trimmed.
    pub text: String,
    pub mentions: Vec<Mention>,
}

/// A button press on a previously sent card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCallback {
    /// Action tag, e.g. `clear`.
    pub kind: String,
    #[serde(rename = "sessionId", default)]
    pub conversation_id: String,
    #[serde(rename = "msgId", default)]
    pub message_id: String,
    #[serde(rename = "chatType", default = "default_chat_kind")]
    pub chat_kind: ChatKind,
    /// The whole action payload as delivered by the platform.
    #[serde(skip)]
    pub value: serde_json::Value,
}

fn default_chat_kind() -> ChatKind {
    ChatKind::Other
}

impl CardCallback {
    /// Resolve a callback from a button's action payload.
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        let mut callback: Self = serde_json::from_value(value.clone())?;
        callback.value = value;
        Ok(callback)
    }

    /// The payload a button must carry to resolve back into this callback.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind,
            "chatType": self.chat_kind,
            "sessionId": self.conversation_id,
            "msgId": self.message_id,
        })
    }
}
