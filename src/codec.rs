//! Header codec: the reversible mapping between a message's typed headers
//! and the flat string map a tracer's inject/extract protocol expects.
//!
//! Some transports forbid `-` in header keys, so keys are escaped with a
//! fixed token on the inject path and unescaped on the extract path. The two
//! functions are inverses over arbitrary input and never fail.
//!
//! [`MessageHeaderCarrier`] is the inject/extract view over a [`Message`]:
//! reads see only string-valued headers (with keys decoded), writes are
//! staged as strings (with keys encoded), and [`into_message`] merges the
//! staged writes back without disturbing any untouched header — non-string
//! values keep their original type.
//!
//! [`into_message`]: MessageHeaderCarrier::into_message

use crate::carrier::{CarrierError, HeaderCarrier};
use crate::message::{HeaderValue, Message};
use std::collections::HashMap;

/// Escape token substituted for a literal `-` in header keys. Must be the
/// same on both ends of one deployment.
pub const ESCAPED_DASH: &str = "_$dash$_";

/// Replace every literal `-` with the escape token.
pub fn encode_key(key: &str) -> String {
    key.replace('-', ESCAPED_DASH)
}

/// Replace every escape token with a literal `-`. Inverse of [`encode_key`].
pub fn decode_key(key: &str) -> String {
    key.replace(ESCAPED_DASH, "-")
}

/// Mutable inject/extract view over a [`Message`]'s headers.
pub struct MessageHeaderCarrier {
    message: Message,
    /// Decoded-key view of the string-valued headers, plus staged writes so
    /// a re-read observes them.
    view: HashMap<String, String>,
    /// Writes staged under their encoded keys, merged back by
    /// [`into_message`](Self::into_message).
    writes: HashMap<String, String>,
}

impl MessageHeaderCarrier {
    pub fn new(message: &Message) -> Self {
        let view = message
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_str()
                    .map(|v| (decode_key(key), v.to_string()))
            })
            .collect();
        Self {
            message: message.clone(),
            view,
            writes: HashMap::new(),
        }
    }

    /// Materialize a new message: every original header untouched, staged
    /// writes added as string headers, payload shared.
    pub fn into_message(self) -> Message {
        let mut headers = self.message.headers().clone();
        for (key, value) in self.writes {
            headers.insert(key, HeaderValue::String(value));
        }
        Message::from_parts(self.message.payload_arc(), headers)
    }
}

impl HeaderCarrier for MessageHeaderCarrier {
    fn get(&self, key: &str) -> Option<&str> {
        self.view.get(key).map(|s| s.as_str())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CarrierError> {
        self.writes.insert(encode_key(key), value.clone());
        self.view.insert(key.to_string(), value);
        Ok(())
    }

    fn keys(&self) -> Vec<&str> {
        self.view.keys().map(|s| s.as_str()).collect()
    }
}

/// Extract-only adapter over raw transport headers (already flat strings,
/// keys still escaped). Used strictly as an extract source when a message
/// re-enters the system from a passthrough transport; writes are rejected
/// because they would never reach the transport's own header store.
#[derive(Debug, Default)]
pub struct TransportHeaderCarrier {
    headers: HashMap<String, String>,
}

impl TransportHeaderCarrier {
    /// Decode the given raw header pairs. An empty iterator (the absent-
    /// source case) yields an empty carrier, same as [`Default`].
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let headers = pairs
            .into_iter()
            .map(|(key, value)| (decode_key(&key), value))
            .collect();
        Self { headers }
    }
}

impl HeaderCarrier for TransportHeaderCarrier {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|s| s.as_str())
    }

    fn set(&mut self, _key: &str, _value: String) -> Result<(), CarrierError> {
        Err(CarrierError::ReadOnly(
            "TransportHeaderCarrier is only usable as an extract source",
        ))
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|s| s.as_str()).collect()
    }
}
