use streambot_common::{ChatMessage, types::serialized_len};

/// Bound a history to `max_len` bytes of JSON-encoded messages.
///
/// Within budget the history is returned unchanged. Over budget, a single
/// pass keeps the entries at even indices (0, 2, 4, …) in order; the result
/// is not re-checked against the budget.
#[must_use]
pub fn compact_history(messages: Vec<ChatMessage>, max_len: usize) -> Vec<ChatMessage> {
    if serialized_len(&messages) <= max_len {
        return messages;
    }
    messages.into_iter().step_by(2).collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("q{i}"))
                } else {
                    ChatMessage::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn within_budget_is_untouched() {
        let msgs = history(4);
        let budget = serialized_len(&msgs);
        assert_eq!(compact_history(msgs.clone(), budget), msgs);
    }

    #[rstest]
    #[case(1, &[0])]
    #[case(2, &[0])]
    #[case(5, &[0, 2, 4])]
    #[case(6, &[0, 2, 4])]
    fn over_budget_keeps_even_indices(#[case] n: usize, #[case] kept: &[usize]) {
        let msgs = history(n);
        let compacted = compact_history(msgs.clone(), 0);
        let expected: Vec<_> = kept.iter().map(|&i| msgs[i].clone()).collect();
        assert_eq!(compacted, expected);
    }

    #[test]
    fn single_pass_even_if_still_over_budget() {
        let msgs = history(8);
        let compacted = compact_history(msgs, 1);
        assert_eq!(compacted.len(), 4);
    }

    #[test]
    fn empty_history() {
        assert!(compact_history(Vec::new(), 0).is_empty());
    }
}
