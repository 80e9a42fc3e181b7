//! Feishu card JSON.
//!
//! Static replies use message card v1 (`config`/`header`/`elements`).
//! Streaming replies use a CardKit 2.0 entity with three markdown elements
//! that are edited in place by element id.

use serde_json::{Value, json};

use streambot_channels::{CardElement, StaticCard};

pub const THINK_ELEMENT: &str = "think";
pub const ANSWER_ELEMENT: &str = "answer";
pub const REFERENCE_ELEMENT: &str = "reference";

/// Render a static card as a message card v1 body.
pub fn static_card_json(card: &StaticCard) -> Value {
    let elements: Vec<Value> = card.elements.iter().map(element_json).collect();
    json!({
        "config": {
            "wide_screen_mode": false,
            "enable_forward": true,
            "update_multi": true,
        },
        "header": {
            "title": { "tag": "plain_text", "content": card.title },
            "template": card.template.as_str(),
        },
        "elements": elements,
    })
}

fn element_json(element: &CardElement) -> Value {
    match element {
        CardElement::Note(text) => json!({
            "tag": "note",
            "elements": [{ "tag": "plain_text", "content": text }],
        }),
        CardElement::Markdown(text) => markdown_div(text),
        CardElement::Divider => json!({ "tag": "hr" }),
        CardElement::MarkdownWithButton {
            markdown,
            label,
            value,
            style,
        } => {
            let mut div = markdown_div(markdown);
            if let Some(obj) = div.as_object_mut() {
                obj.insert(
                    "extra".into(),
                    json!({
                        "tag": "button",
                        "text": { "tag": "plain_text", "content": label },
                        "type": style.as_str(),
                        "value": value,
                    }),
                );
            }
            div
        },
    }
}

fn markdown_div(text: &str) -> Value {
    json!({
        "tag": "div",
        "fields": [{
            "is_short": true,
            "text": { "tag": "lark_md", "content": text },
        }],
    })
}

/// CardKit entity for a streaming reply: empty think/answer/reference
/// elements with streaming mode on.
pub fn streaming_card_json() -> Value {
    let element = |id: &str, text_size: &str| {
        json!({
            "tag": "markdown",
            "element_id": id,
            "content": "",
            "text_align": "left",
            "text_size": text_size,
            "margin": "0px 0px 0px 0px",
        })
    };
    json!({
        "schema": "2.0",
        "config": {
            "update_multi": true,
            "streaming_mode": true,
            "streaming_config": {
                "print_step": { "default": 1 },
                "print_frequency_ms": { "default": 70 },
                "print_strategy": "fast",
            },
            "style": {
                "text_size": {
                    "normal_v2": {
                        "default": "normal",
                        "pc": "normal",
                        "mobile": "heading",
                    },
                },
            },
        },
        "body": {
            "direction": "vertical",
            "padding": "12px 12px 12px 12px",
            "elements": [
                element(THINK_ELEMENT, "notation"),
                element(ANSWER_ELEMENT, "normal_v2"),
                element(REFERENCE_ELEMENT, "normal_v2"),
            ],
        },
    })
}

/// Card settings that end streaming mode, optionally attaching a link.
pub fn finalize_settings_json(card_link: Option<&str>) -> Value {
    let mut settings = json!({
        "config": {
            "streaming_mode": false,
            "enable_forward": true,
            "update_multi": true,
            "width_mode": "fill",
            "enable_forward_interaction": false,
        },
    });
    if let Some(url) = card_link
        && let Some(obj) = settings.as_object_mut()
    {
        obj.insert(
            "card_link".into(),
            json!({
                "url": url,
                "android_url": url,
                "ios_url": url,
                "pc_url": url,
            }),
        );
    }
    settings
}

/// Message content that embeds an existing card entity.
pub fn card_reference_content(card_id: &str) -> Value {
    json!({ "type": "card", "data": { "card_id": card_id } })
}
