//! Event callback parsing.
//!
//! Feishu posts schema 2.0 envelopes (`header` + `event`) to the callback
//! URL, plus a one-off `url_verification` handshake when the URL is saved in
//! the developer console. Card button presses arrive either as a 2.0
//! `card.action.trigger` event or as a legacy flat payload with a top-level
//! `action`.

use {
    serde::Deserialize,
    serde_json::Value,
    tracing::{debug, warn},
};

use streambot_channels::{
    CardCallback, ChatKind, Error, InboundMessage, Mention, Result, normalize::strip_mentions,
};

pub const MESSAGE_RECEIVE: &str = "im.message.receive_v1";
pub const CARD_ACTION_TRIGGER: &str = "card.action.trigger";

/// A parsed callback payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FeishuEvent {
    /// URL handshake; the challenge must be echoed back.
    UrlVerification { challenge: String },
    Message(InboundMessage),
    CardAction(CardCallback),
    /// Well-formed, but nothing for the bot to do.
    Ignored { event_type: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    challenge: Option<String>,
    token: Option<String>,
    encrypt: Option<String>,
    header: Option<EventHeader>,
    event: Option<Value>,
    action: Option<CardAction>,
}

#[derive(Debug, Deserialize)]
struct EventHeader {
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    event_type: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageReceiveEvent {
    sender: Sender,
    message: EventMessage,
}

#[derive(Debug, Deserialize)]
struct Sender {
    #[serde(default)]
    sender_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
struct UserId {
    user_id: Option<String>,
    open_id: Option<String>,
}

impl UserId {
    fn preferred(&self) -> Option<String> {
        self.user_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| self.open_id.clone())
    }
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    message_id: String,
    root_id: Option<String>,
    #[serde(default)]
    chat_id: String,
    #[serde(default)]
    chat_type: String,
    message_type: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    mentions: Vec<EventMention>,
}

#[derive(Debug, Deserialize)]
struct EventMention {
    #[serde(default)]
    name: String,
    #[serde(default)]
    id: UserId,
}

#[derive(Debug, Deserialize)]
struct CardActionEvent {
    action: CardAction,
}

#[derive(Debug, Deserialize)]
struct CardAction {
    #[serde(default)]
    value: Value,
}

/// Parse a callback body, checking its verification token when one is
/// configured.
///
/// Encrypted payloads are rejected. Messages of a type other than `text` or
/// `post` yield [`Error::Unsupported`].
pub fn parse_event(payload: Value, verification_token: Option<&str>) -> Result<FeishuEvent> {
    let envelope: Envelope = serde_json::from_value(payload)?;

    if envelope.encrypt.is_some() {
        return Err(Error::unsupported(
            "encrypted event payloads are not supported; disable the encrypt key",
        ));
    }

    let token = envelope
        .header
        .as_ref()
        .and_then(|h| h.token.as_deref())
        .or(envelope.token.as_deref());
    if let Some(expected) = verification_token.filter(|t| !t.is_empty())
        && token != Some(expected)
    {
        return Err(Error::invalid_input("verification token mismatch"));
    }

    if envelope.kind.as_deref() == Some("url_verification") {
        let challenge = envelope
            .challenge
            .ok_or_else(|| Error::invalid_input("url_verification without challenge"))?;
        return Ok(FeishuEvent::UrlVerification { challenge });
    }

    if let Some(action) = envelope.action {
        return Ok(FeishuEvent::CardAction(CardCallback::from_value(action.value)?));
    }

    let Some(header) = envelope.header else {
        return Err(Error::invalid_input("event payload without header"));
    };
    let event = envelope
        .event
        .ok_or_else(|| Error::invalid_input("event payload without body"))?;
    debug!(event_id = %header.event_id, event_type = %header.event_type, "feishu event");

    match header.event_type.as_str() {
        MESSAGE_RECEIVE => {
            let event: MessageReceiveEvent = serde_json::from_value(event)?;
            match to_inbound(event)? {
                Some(msg) => Ok(FeishuEvent::Message(msg)),
                None => Ok(FeishuEvent::Ignored {
                    event_type: header.event_type,
                }),
            }
        },
        CARD_ACTION_TRIGGER => {
            let event: CardActionEvent = serde_json::from_value(event)?;
            Ok(FeishuEvent::CardAction(CardCallback::from_value(
                event.action.value,
            )?))
        },
        _ => Ok(FeishuEvent::Ignored {
            event_type: header.event_type,
        }),
    }
}

fn to_inbound(event: MessageReceiveEvent) -> Result<Option<InboundMessage>> {
    let msg = event.message;
    let chat_kind = match msg.chat_type.as_str() {
        "group" => ChatKind::Group,
        "p2p" => ChatKind::Direct,
        other => {
            warn!(chat_type = other, message_id = %msg.message_id, "ignoring message from unknown chat type");
            return Ok(None);
        },
    };

    let raw = match msg.message_type.as_str() {
        "text" => text_content(&msg.content)?,
        "post" => post_content(&msg.content)?,
        other => {
            return Err(Error::unsupported(format!("message type {other}")));
        },
    };

    let conversation_id = msg
        .root_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| msg.message_id.clone());

    Ok(Some(InboundMessage {
        conversation_id,
        message_id: msg.message_id,
        chat_id: msg.chat_id,
        chat_kind,
        sender_id: event.sender.sender_id.preferred().unwrap_or_default(),
        text: strip_mentions(&raw),
        mentions: msg
            .mentions
            .into_iter()
            .map(|m| Mention {
                id: m.id.open_id.clone().or_else(|| m.id.user_id.clone()),
                name: m.name,
            })
            .collect(),
    }))
}

fn text_content(content: &str) -> Result<String> {
    #[derive(Deserialize)]
    struct Text {
        #[serde(default)]
        text: String,
    }
    let parsed: Text = serde_json::from_str(content)?;
    Ok(parsed.text)
}

/// Flatten a rich-text post: the title and a blank line, then each
/// paragraph's `text` runs joined, one paragraph per line.
fn post_content(content: &str) -> Result<String> {
    let value: Value = serde_json::from_str(content)?;
    // Some deliveries wrap the post in a locale key such as `zh_cn`.
    let post = if value.get("content").is_some() {
        &value
    } else {
        value
            .as_object()
            .and_then(|obj| obj.values().find(|v| v.get("content").is_some()))
            .ok_or_else(|| Error::invalid_input("post message without content"))?
    };

    let mut text = String::new();
    if let Some(title) = post.get("title").and_then(Value::as_str) {
        text.push_str(title);
        text.push_str("\n\n");
    }
    for paragraph in post["content"].as_array().into_iter().flatten() {
        for run in paragraph.as_array().into_iter().flatten() {
            if run.get("tag").and_then(Value::as_str) == Some("text")
                && let Some(t) = run.get("text").and_then(Value::as_str)
            {
                text.push_str(t);
            }
        }
        text.push('\n');
    }
    Ok(text.trim().to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn message_event(chat_type: &str, message_type: &str, content: Value, root_id: &str) -> Value {
        json!({
            "schema": "2.0",
            "header": {
                "event_id": "ev_1",
                "event_type": MESSAGE_RECEIVE,
                "token": "vtok",
                "app_id": "cli_a",
            },
            "event": {
                "sender": {
                    "sender_id": { "user_id": "u_1", "open_id": "ou_1" },
                    "sender_type": "user",
                },
                "message": {
                    "message_id": "om_1",
                    "root_id": root_id,
                    "chat_id": "oc_1",
                    "chat_type": chat_type,
                    "message_type": message_type,
                    "content": content.to_string(),
                    "mentions": [{
                        "key": "@_user_1",
                        "name": "streambot",
                        "id": { "open_id": "ou_bot" },
                    }],
                },
            },
        })
    }

    #[test]
    fn url_verification_echoes_challenge() {
        let payload = json!({ "type": "url_verification", "challenge": "abc", "token": "vtok" });
        assert_eq!(
            parse_event(payload, Some("vtok")).unwrap(),
            FeishuEvent::UrlVerification {
                challenge: "abc".into()
            }
        );
    }

    #[test]
    fn token_mismatch_is_rejected() {
        let payload = message_event("p2p", "text", json!({ "text": "hi" }), "");
        let err = parse_event(payload, Some("other")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn encrypted_payload_is_rejected() {
        let err = parse_event(json!({ "encrypt": "xyz" }), None).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn group_text_message() {
        let payload = message_event(
            "group",
            "text",
            json!({ "text": "@_user_1 what is rust" }),
            "",
        );
        let FeishuEvent::Message(msg) = parse_event(payload, Some("vtok")).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(msg.chat_kind, ChatKind::Group);
        assert_eq!(msg.text, "what is rust");
        assert_eq!(msg.conversation_id, "om_1");
        assert_eq!(msg.sender_id, "u_1");
        assert_eq!(msg.mentions, vec![Mention {
            name: "streambot".into(),
            id: Some("ou_bot".into()),
        }]);
    }

    #[test]
    fn thread_reply_uses_root_id() {
        let payload = message_event("p2p", "text", json!({ "text": "more" }), "om_root");
        let FeishuEvent::Message(msg) = parse_event(payload, None).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(msg.chat_kind, ChatKind::Direct);
        assert_eq!(msg.conversation_id, "om_root");
    }

    #[test]
    fn post_message_is_flattened() {
        let content = json!({
            "title": "Title",
            "content": [
                [{ "tag": "text", "text": "line " }, { "tag": "at", "user_id": "x" }, { "tag": "text", "text": "one" }],
                [{ "tag": "img", "image_key": "k" }],
                [{ "tag": "text", "text": "line two" }],
            ],
        });
        let payload = message_event("p2p", "post", content, "");
        let FeishuEvent::Message(msg) = parse_event(payload, None).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(msg.text, "Title\n\nline one\n\nline two");
    }

    #[test]
    fn localized_post_is_unwrapped() {
        let content = json!({ "zh_cn": { "content": [[{ "tag": "text", "text": "你好" }]] } });
        assert_eq!(post_content(&content.to_string()).unwrap(), "你好");
    }

    #[test]
    fn unsupported_message_type() {
        let payload = message_event("p2p", "image", json!({ "image_key": "k" }), "");
        let err = parse_event(payload, None).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn unknown_chat_type_is_ignored() {
        let payload = message_event("topic", "text", json!({ "text": "x" }), "");
        assert!(matches!(
            parse_event(payload, None).unwrap(),
            FeishuEvent::Ignored { .. }
        ));
    }

    #[test]
    fn card_action_v2() {
        let payload = json!({
            "schema": "2.0",
            "header": { "event_id": "ev_2", "event_type": CARD_ACTION_TRIGGER, "token": "vtok" },
            "event": {
                "action": {
                    "tag": "button",
                    "value": { "kind": "clear", "chatType": "group", "sessionId": "om_root", "msgId": "om_1" },
                },
            },
        });
        let FeishuEvent::CardAction(cb) = parse_event(payload, Some("vtok")).unwrap() else {
            panic!("expected a card action");
        };
        assert_eq!(cb.kind, "clear");
        assert_eq!(cb.conversation_id, "om_root");
    }

    #[test]
    fn legacy_card_action() {
        let payload = json!({
            "open_id": "ou_1",
            "token": "vtok",
            "action": { "tag": "button", "value": { "kind": "clear", "sessionId": "s" } },
        });
        let FeishuEvent::CardAction(cb) = parse_event(payload, Some("vtok")).unwrap() else {
            panic!("expected a card action");
        };
        assert_eq!(cb.conversation_id, "s");
    }

    #[test]
    fn other_events_are_ignored() {
        let payload = json!({
            "schema": "2.0",
            "header": { "event_type": "im.chat.member.bot.added_v1" },
            "event": {},
        });
        assert_eq!(
            parse_event(payload, None).unwrap(),
            FeishuEvent::Ignored {
                event_type: "im.chat.member.bot.added_v1".into()
            }
        );
    }
}
