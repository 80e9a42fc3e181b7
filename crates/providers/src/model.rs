use std::pin::Pin;

use {streambot_common::ChatMessage, tokio_stream::Stream};

use crate::error::Result;

/// Upper bound on generated tokens per reply.
pub const MAX_TOKENS: u32 = 8092;

/// One item of a provider's reply stream, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Chain-of-thought delta.
    Reasoning(String),
    /// Answer text delta.
    Answer(String),
    /// Source reference reported by the transport. `index` is 1-based.
    Citation {
        index: usize,
        title: String,
        url: String,
    },
}

impl ProviderEvent {
    /// Card line for a citation: `"[index] [title](url)\n"`.
    pub fn render_citation(index: usize, title: &str, url: &str) -> String {
        format!("[{index}] [{title}]({url})\n")
    }
}

pub type ProviderStream<'a> = Pin<Box<dyn Stream<Item = Result<ProviderEvent>> + Send + 'a>>;

/// A generative-AI backend that replies as an event stream.
///
/// The stream ends after the transport does; a transport failure is yielded as
/// the terminal `Err`. Dropping the stream cancels the request.
pub trait AiProvider: Send + Sync {
    /// Registry name, e.g. "openai" or "volc".
    fn id(&self) -> &str;

    fn stream_chat(&self, history: Vec<ChatMessage>) -> ProviderStream<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_line_format() {
        assert_eq!(
            ProviderEvent::render_citation(2, "Rust", "https://rust-lang.org"),
            "[2] [Rust](https://rust-lang.org)\n"
        );
    }
}
