//! Shared streaming for OpenAI-compatible chat-completions endpoints.
//!
//! Both the OpenAI and the Volcengine Ark bot APIs stream `data: {json}` SSE
//! lines terminated by `data: [DONE]`, with deltas at `choices[0].delta`.

use {
    futures::StreamExt,
    secrecy::{ExposeSecret, Secret},
    streambot_common::ChatMessage,
    tracing::{debug, trace, warn},
};

use crate::{
    error::Error,
    model::{ProviderEvent, ProviderStream},
};

/// Result of processing a single SSE data line.
#[derive(Debug, PartialEq, Eq)]
pub enum SseLineResult {
    /// No actionable event (unparseable JSON, empty delta, keep-alive)
    Skip,
    /// Stream is done
    Done,
    /// Events to yield
    Events(Vec<ProviderEvent>),
    /// The server reported an error inside the stream
    Error(String),
}

/// Process a single SSE data payload (the text after `data:`).
///
/// A chunk with a `reasoning_content` field is reasoning, even when that
/// field is empty; otherwise `content` is answer text. References are only
/// read from chunks that carry choices and are numbered from 1 per chunk.
pub fn process_sse_line(data: &str) -> SseLineResult {
    if data == "[DONE]" {
        return SseLineResult::Done;
    }

    let Ok(evt) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseLineResult::Skip;
    };

    if let Some(err) = evt.get("error").filter(|e| !e.is_null()) {
        let message = err["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return SseLineResult::Error(message);
    }

    let Some(choice) = evt["choices"].as_array().and_then(|c| c.first()) else {
        return SseLineResult::Skip;
    };

    let mut events = Vec::new();

    if let Some(refs) = evt["references"].as_array() {
        for (i, r) in refs.iter().enumerate() {
            events.push(ProviderEvent::Citation {
                index: i + 1,
                title: r["title"].as_str().unwrap_or_default().to_string(),
                url: r["url"].as_str().unwrap_or_default().to_string(),
            });
        }
    }

    let delta = &choice["delta"];
    if let Some(reasoning) = delta["reasoning_content"].as_str() {
        if !reasoning.is_empty() {
            events.push(ProviderEvent::Reasoning(reasoning.to_string()));
        }
    } else if let Some(content) = delta["content"].as_str()
        && !content.is_empty()
    {
        events.push(ProviderEvent::Answer(content.to_string()));
    }

    if events.is_empty() {
        SseLineResult::Skip
    } else {
        SseLineResult::Events(events)
    }
}

/// Serialize history into the `messages` array of a chat-completions request.
pub fn to_request_messages(history: &[ChatMessage]) -> Vec<serde_json::Value> {
    history
        .iter()
        .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

/// POST `body` to `url` and stream the SSE reply as provider events.
pub fn stream_completion<'a>(
    client: &'a reqwest::Client,
    provider: &'a str,
    url: String,
    api_key: &'a Secret<String>,
    body: serde_json::Value,
) -> ProviderStream<'a> {
    Box::pin(async_stream::stream! {
        debug!(
            provider,
            url = %url,
            messages_count = body["messages"].as_array().map_or(0, Vec::len),
            "chat completion stream request"
        );
        trace!(body = %body, "chat completion stream request body");

        let resp = match client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => {
                let status = r.status();
                if !status.is_success() {
                    let body_text = r.text().await.unwrap_or_default();
                    warn!(provider, status = status.as_u16(), "chat completion request rejected");
                    yield Err(Error::Status {
                        status: status.as_u16(),
                        body: body_text,
                    });
                    return;
                }
                r
            }
            Err(e) => {
                yield Err(Error::Http(e));
                return;
            }
        };

        let mut byte_stream = resp.bytes_stream();
        // Raw bytes: a chunk may end inside a multi-byte character.
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(Error::Http(e));
                    return;
                }
            };
            buf.extend_from_slice(&chunk);

            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buf.drain(..=pos).collect();
                let line = decode_line(&raw);

                let Some(data) = sse_data(&line) else {
                    continue;
                };

                match process_sse_line(data) {
                    SseLineResult::Done => return,
                    SseLineResult::Events(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    SseLineResult::Error(message) => {
                        yield Err(Error::stream(message));
                        return;
                    }
                    SseLineResult::Skip => {}
                }
            }
        }

        // Some servers close without a [DONE] frame or trailing newline.
        let line = decode_line(&buf);
        if let Some(data) = sse_data(&line) {
            match process_sse_line(data) {
                SseLineResult::Events(events) => {
                    for event in events {
                        yield Ok(event);
                    }
                }
                SseLineResult::Error(message) => {
                    yield Err(Error::stream(message));
                }
                SseLineResult::Done | SseLineResult::Skip => {}
            }
        }
    })
}

/// Decode one complete line. Lines end at `\n`, which never occurs inside a
/// multi-byte UTF-8 sequence.
fn decode_line(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(line) => line.trim().to_string(),
        Err(_) => String::from_utf8_lossy(raw).trim().to_string(),
    }
}

fn sse_data(line: &str) -> Option<&str> {
    if line.is_empty() {
        return None;
    }
    line.strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn events(data: &str) -> Vec<ProviderEvent> {
        match process_sse_line(data) {
            SseLineResult::Events(events) => events,
            other => panic!("expected events, got {other:?}"),
        }
    }

    #[test]
    fn done_frame() {
        assert_eq!(process_sse_line("[DONE]"), SseLineResult::Done);
    }

    #[test]
    fn answer_delta() {
        assert_eq!(
            events(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#),
            vec![ProviderEvent::Answer("Hi".into())]
        );
    }

    #[test]
    fn reasoning_takes_precedence_over_content() {
        assert_eq!(
            events(r#"{"choices":[{"delta":{"reasoning_content":"hmm","content":"x"}}]}"#),
            vec![ProviderEvent::Reasoning("hmm".into())]
        );
        assert_eq!(
            process_sse_line(r#"{"choices":[{"delta":{"reasoning_content":"","content":"x"}}]}"#),
            SseLineResult::Skip
        );
    }

    #[test]
    fn null_reasoning_falls_through_to_content() {
        assert_eq!(
            events(r#"{"choices":[{"delta":{"reasoning_content":null,"content":"ok"}}]}"#),
            vec![ProviderEvent::Answer("ok".into())]
        );
    }

    #[test]
    fn empty_deltas_are_skipped() {
        assert_eq!(
            process_sse_line(r#"{"choices":[{"delta":{"content":""}}]}"#),
            SseLineResult::Skip
        );
        assert_eq!(
            process_sse_line(r#"{"choices":[],"usage":{"prompt_tokens":3}}"#),
            SseLineResult::Skip
        );
        assert_eq!(process_sse_line("not json"), SseLineResult::Skip);
    }

    #[test]
    fn references_become_numbered_citations_before_delta() {
        let got = events(
            r#"{"choices":[{"delta":{"content":"a"}}],
                "references":[{"title":"T1","url":"https://a"},{"title":"T2","url":"https://b"}]}"#,
        );
        assert_eq!(got, vec![
            ProviderEvent::Citation {
                index: 1,
                title: "T1".into(),
                url: "https://a".into(),
            },
            ProviderEvent::Citation {
                index: 2,
                title: "T2".into(),
                url: "https://b".into(),
            },
            ProviderEvent::Answer("a".into()),
        ]);
    }

    #[test]
    fn references_without_choices_are_ignored() {
        assert_eq!(
            process_sse_line(r#"{"choices":[],"references":[{"title":"T","url":"u"}]}"#),
            SseLineResult::Skip
        );
    }

    #[test]
    fn in_stream_error() {
        assert_eq!(
            process_sse_line(r#"{"error":{"message":"quota exceeded"}}"#),
            SseLineResult::Error("quota exceeded".into())
        );
    }

    #[test]
    fn request_messages_shape() {
        let msgs = to_request_messages(&[ChatMessage::user("q"), ChatMessage::assistant("a")]);
        assert_eq!(
            serde_json::Value::Array(msgs),
            serde_json::json!([
                {"role": "user", "content": "q"},
                {"role": "assistant", "content": "a"},
            ])
        );
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        let frame = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\ndata: [DONE]\n\n";
        let bytes = frame.as_bytes();
        // One byte into the three-byte encoding of the first character.
        let split = frame.find('你').unwrap() + 1;
        let base_url = crate::test_support::start_chunked_sse_mock(
            "/chat/completions",
            vec![bytes[..split].to_vec(), bytes[split..].to_vec()],
            std::time::Duration::from_millis(50),
        )
        .await;

        let client = reqwest::Client::new();
        let key = Secret::new("k".to_string());
        let items: Vec<_> = stream_completion(
            &client,
            "test",
            format!("{base_url}/chat/completions"),
            &key,
            serde_json::json!({ "messages": [] }),
        )
        .map(|r| r.unwrap())
        .collect()
        .await;
        assert_eq!(items, vec![ProviderEvent::Answer("你好".into())]);
    }

    #[test]
    fn decode_line_trims_complete_lines() {
        assert_eq!(decode_line("data: 你好\r\n".as_bytes()), "data: 你好");
        assert_eq!(decode_line(b""), "");
    }

    #[test]
    fn sse_data_prefixes() {
        assert_eq!(sse_data("data: x"), Some("x"));
        assert_eq!(sse_data("data:x"), Some("x"));
        assert_eq!(sse_data(": keep-alive"), None);
        assert_eq!(sse_data(""), None);
    }
}
