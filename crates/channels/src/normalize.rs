use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static MENTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\S*").expect("valid mention regex"));

/// Remove `@token` runs (an `@` through the next whitespace) and trim.
///
/// Platforms render mentions as placeholders such as `@_user_1`; the bot only
/// answers the remaining text.
pub fn strip_mentions(text: &str) -> String {
    MENTION_TOKEN.replace_all(text, "").trim().to_string()
}
