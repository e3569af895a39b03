//! The fixed argument tuple passed to every hook.
//!
//! Hooks always receive `(message, true, headers, true)`. The two flags are
//! part of the hub's historical calling convention: they mark the message
//! and headers positions as present. The bridge never reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Hub message record, as parsed by the surrounding hub.
pub type Message = Map<String, Value>;

/// Flag passed after the message argument. Always `true`.
pub const MESSAGE_ARG_FLAG: bool = true;

/// Flag passed after the headers argument. Always `true`.
pub const HEADERS_ARG_FLAG: bool = true;

// ── Headers ───────────────────────────────────────────────────────────────────

/// Request headers forwarded to hooks.
///
/// Names are case-insensitive (stored lowercased); each name may carry
/// several values in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    entries: BTreeMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values for `name` with `value`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// Add `value` after any existing values for `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Header names, lowercased and sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value);
        }
        headers
    }
}

// ── InvocationArgs ────────────────────────────────────────────────────────────

/// Immutable `(message, flag, headers, flag)` tuple handed to a hook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationArgs {
    message: Message,
    message_flag: bool,
    headers: Headers,
    headers_flag: bool,
}

impl InvocationArgs {
    pub fn new(message: Message, headers: Headers) -> Self {
        Self {
            message,
            message_flag: MESSAGE_ARG_FLAG,
            headers,
            headers_flag: HEADERS_ARG_FLAG,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The two positional flags, in argument order.
    pub fn flags(&self) -> (bool, bool) {
        (self.message_flag, self.headers_flag)
    }

    pub fn into_parts(self) -> (Message, Headers) {
        (self.message, self.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_names_are_case_insensitive() {
        let mut h = Headers::new();
        h.insert("Content-Type", "application/json");
        assert_eq!(h.get("content-type"), Some("application/json"));
        assert_eq!(h.get("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn append_keeps_arrival_order() {
        let h: Headers = [("Link", "<a>; rel=hub"), ("link", "<b>; rel=self")]
            .into_iter()
            .collect();
        assert_eq!(h.get_all("LINK"), ["<a>; rel=hub", "<b>; rel=self"]);
        assert_eq!(h.get("link"), Some("<a>; rel=hub"));
        assert_eq!(h.names().collect::<Vec<_>>(), vec!["link"]);
    }

    #[test]
    fn insert_replaces_previous_values() {
        let mut h = Headers::new();
        h.append("x-a", "1");
        h.append("x-a", "2");
        h.insert("X-A", "3");
        assert_eq!(h.get_all("x-a"), ["3"]);
    }

    #[test]
    fn missing_header_is_empty() {
        let h = Headers::new();
        assert!(h.is_empty());
        assert_eq!(h.get("x-missing"), None);
        assert!(h.get_all("x-missing").is_empty());
    }

    #[test]
    fn args_carry_fixed_flags() {
        let mut message = Message::new();
        message.insert("topic".into(), json!("t1"));
        let args = InvocationArgs::new(message, Headers::new());
        assert_eq!(args.flags(), (true, true));
        assert_eq!(args.message().get("topic"), Some(&json!("t1")));
    }
}
