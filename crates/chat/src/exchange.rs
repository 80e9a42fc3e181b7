//! Working state of one question-to-answer cycle.

use {streambot_channels::StreamUpdate, streambot_providers::ProviderEvent};

/// Where an exchange is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Opening,
    AwaitingContent,
    Streaming,
    Finalizing,
    Failed,
    Done,
}

/// How an exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The answer was streamed, finalized and stored.
    Completed,
    /// No provider output arrived within the idle timeout.
    TimedOut,
    /// The provider or the card sink failed mid-exchange.
    Failed,
    /// The card could not be created or posted; the AI was never called.
    OpenFailed,
    /// Shutdown interrupted the exchange.
    Cancelled,
}

impl ExchangeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
            Self::OpenFailed => "open_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Accumulated reply text of an exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub state: ExchangeState,
    pub thinking: String,
    pub answer: String,
    pub reference: String,
}

impl Default for Exchange {
    fn default() -> Self {
        Self {
            state: ExchangeState::Opening,
            thinking: String::new(),
            answer: String::new(),
            reference: String::new(),
        }
    }
}

impl Exchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider event to the matching field.
    pub fn apply(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::Reasoning(text) => self.thinking.push_str(&text),
            ProviderEvent::Answer(text) => self.answer.push_str(&text),
            ProviderEvent::Citation { index, title, url } => self
                .reference
                .push_str(&ProviderEvent::render_citation(index, &title, &url)),
        }
    }

    /// Thinking rendered as a markdown blockquote, or empty.
    pub fn thinking_display(&self) -> String {
        if self.thinking.is_empty() {
            return String::new();
        }
        format!("> {}", self.thinking.replace("\n\n", "\n>"))
    }

    /// Periodic snapshot: thinking and answer, references withheld.
    pub fn snapshot(&self) -> StreamUpdate {
        StreamUpdate {
            thinking: self.thinking_display(),
            answer: self.answer.clone(),
            reference: String::new(),
        }
    }

    /// The last update of a completed exchange, carrying every field.
    pub fn final_update(&self) -> StreamUpdate {
        StreamUpdate {
            thinking: self.thinking_display(),
            answer: self.answer.clone(),
            reference: self.reference.clone(),
        }
    }

    /// Combined text for the completion log.
    pub fn response_log(&self) -> String {
        format!("{}\n{}\n{}", self.thinking, self.answer, self.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_accumulate_per_field() {
        let mut ex = Exchange::new();
        ex.apply(ProviderEvent::Reasoning("a".into()));
        ex.apply(ProviderEvent::Answer("Hi".into()));
        ex.apply(ProviderEvent::Reasoning("b".into()));
        ex.apply(ProviderEvent::Answer(" there".into()));
        ex.apply(ProviderEvent::Citation {
            index: 1,
            title: "Rust".into(),
            url: "https://rust-lang.org".into(),
        });
        assert_eq!(ex.thinking, "ab");
        assert_eq!(ex.answer, "Hi there");
        assert_eq!(ex.reference, "[1] [Rust](https://rust-lang.org)\n");
    }

    #[test]
    fn thinking_is_quoted() {
        let mut ex = Exchange::new();
        assert_eq!(ex.thinking_display(), "");
        ex.apply(ProviderEvent::Reasoning("first\n\nsecond".into()));
        assert_eq!(ex.thinking_display(), "> first\n>second");
    }

    #[test]
    fn snapshot_withholds_references() {
        let mut ex = Exchange::new();
        ex.apply(ProviderEvent::Answer("x".into()));
        ex.apply(ProviderEvent::Citation {
            index: 1,
            title: "t".into(),
            url: "u".into(),
        });
        assert!(ex.snapshot().reference.is_empty());
        assert_eq!(ex.final_update().reference, "[1] [t](u)\n");
        assert_eq!(ex.final_update().answer, "x");
    }
}
