//! Content-sniffing heuristics for messages that carry no structural marker.
//!
//! Both checks are best-effort: false positives and negatives are expected, which is why the
//! options that use them are off by default.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Top-level keys of the JSON payloads that browsing and tool plugins post as message text
pub const TOOL_CALL_KEYS: &[&str] = &[
    "search_query",
    "query",
    "open",
    "click",
    "screenshot",
    "find",
    "weather",
    "finance",
    "sports",
    "calculator",
    "time",
    "image_query",
    "product_query",
    "response_length",
];

static THOUGHT_DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:思考時間|thought time)\s*[:：]\s*\d+(?:\.\d+)?\s*(?:s|secs?|seconds?|m|mins?|minutes?|h|hours?|秒|分|分鐘|時間)$",
    )
    .unwrap_or_else(|_| unreachable!())
});

/// `true` if `text` is a JSON object whose keys include a known tool-invocation key
///
/// Anything that fails to parse, or parses to something other than an object, is not a tool
/// payload.
pub fn is_tool_call_json(text: &str) -> bool {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return false;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map.keys().any(|key| TOOL_CALL_KEYS.contains(&key.as_str())),
        _ => false,
    }
}

/// `true` if any of the non-empty text fields is a tool-call payload
pub fn is_tool_call_payload<'a>(texts: impl IntoIterator<Item = &'a str>) -> bool {
    texts.into_iter().any(is_tool_call_json)
}

/// `true` if the whole trimmed text is a single "Thought time: 12s" style line
pub fn is_thought_duration_line(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.contains('\n') && THOUGHT_DURATION_PATTERN.is_match(trimmed)
}
