//! Platform-neutral card models.

use serde::{Deserialize, Serialize};

/// Header colour of a static card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderTemplate {
    Blue,
    Grey,
    Green,
    Orange,
    Red,
}

impl HeaderTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Grey => "grey",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Default,
    Primary,
    Danger,
}

impl ButtonStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Primary => "primary",
            Self::Danger => "danger",
        }
    }
}

/// One body element of a static card.
#[derive(Debug, Clone, PartialEq)]
pub enum CardElement {
    /// Small grey plain-text note.
    Note(String),
    /// Markdown block.
    Markdown(String),
    /// Horizontal rule.
    Divider,
    /// Markdown block with a button beside it; pressing the button delivers
    /// `value` as a card callback.
    MarkdownWithButton {
        markdown: String,
        label: String,
        value: serde_json::Value,
        style: ButtonStyle,
    },
}

/// A non-streaming reply card: a titled header plus elements.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCard {
    pub title: String,
    pub template: HeaderTemplate,
    pub elements: Vec<CardElement>,
}

impl StaticCard {
    pub fn new(title: impl Into<String>, template: HeaderTemplate) -> Self {
        Self {
            title: title.into(),
            template,
            elements: Vec::new(),
        }
    }

    #[must_use]
    pub fn note(mut self, text: impl Into<String>) -> Self {
        self.elements.push(CardElement::Note(text.into()));
        self
    }

    #[must_use]
    pub fn markdown(mut self, text: impl Into<String>) -> Self {
        self.elements.push(CardElement::Markdown(text.into()));
        self
    }

    #[must_use]
    pub fn divider(mut self) -> Self {
        self.elements.push(CardElement::Divider);
        self
    }

    #[must_use]
    pub fn markdown_with_button(
        mut self,
        markdown: impl Into<String>,
        label: impl Into<String>,
        value: serde_json::Value,
        style: ButtonStyle,
    ) -> Self {
        self.elements.push(CardElement::MarkdownWithButton {
            markdown: markdown.into(),
            label: label.into(),
            value,
            style,
        });
        self
    }
}

/// Snapshot pushed to a streaming card. Each field is the whole accumulated
/// text; an empty field leaves that part of the card unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamUpdate {
    pub thinking: String,
    pub answer: String,
    pub reference: String,
}

impl StreamUpdate {
    pub fn answer(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.thinking.is_empty() && self.answer.is_empty() && self.reference.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_in_order() {
        let card = StaticCard::new("t", HeaderTemplate::Blue)
            .markdown("a")
            .divider()
            .note("b");
        assert_eq!(card.elements, vec![
            CardElement::Markdown("a".into()),
            CardElement::Divider,
            CardElement::Note("b".into()),
        ]);
    }

    #[test]
    fn empty_update() {
        assert!(StreamUpdate::default().is_empty());
        assert!(!StreamUpdate::answer("x").is_empty());
    }
}
