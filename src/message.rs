//! Immutable message value with typed metadata headers.
//!
//! A [`Message`] pairs an opaque payload with a string-keyed header map whose
//! values may be strings, integers, floats, or booleans. Messages are treated
//! as copy-on-write: every header edit produces a new `Message` that shares
//! the old payload, so a value handed to the bus is never mutated in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Header holding the message's unique id; assigned at construction and
/// treated specially by transport layers, so it must survive every header
/// round trip untouched.
pub const ID_HEADER: &str = "id";

/// Header holding the construction timestamp in epoch milliseconds. Like
/// [`ID_HEADER`] it must never be dropped or retyped.
pub const TIMESTAMP_HEADER: &str = "timestamp";

/// A typed header value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl HeaderValue {
    /// The string content, when the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::String(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::String(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

/// Immutable message: opaque payload plus typed headers.
#[derive(Debug, Clone)]
pub struct Message {
    payload: Arc<[u8]>,
    headers: HashMap<String, HeaderValue>,
}

impl Message {
    /// Build a message around `payload`, stamping the [`ID_HEADER`] and
    /// [`TIMESTAMP_HEADER`] entries.
    pub fn new(payload: impl Into<Arc<[u8]>>) -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            ID_HEADER.to_string(),
            HeaderValue::String(uuid::Uuid::now_v7().to_string()),
        );
        headers.insert(
            TIMESTAMP_HEADER.to_string(),
            HeaderValue::Int(chrono::Utc::now().timestamp_millis()),
        );
        Self {
            payload: payload.into(),
            headers,
        }
    }

    /// Reassemble a message from a shared payload and an explicit header map.
    /// Does not stamp id/timestamp; the caller owns the map as-is.
    pub fn from_parts(payload: Arc<[u8]>, headers: HashMap<String, HeaderValue>) -> Self {
        Self { payload, headers }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Shared handle to the payload, for copy-on-write header edits.
    pub fn payload_arc(&self) -> Arc<[u8]> {
        Arc::clone(&self.payload)
    }

    pub fn headers(&self) -> &HashMap<String, HeaderValue> {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }

    /// Boolean header content; `None` when absent or not a boolean.
    pub fn bool_header(&self, key: &str) -> Option<bool> {
        self.headers.get(key).and_then(HeaderValue::as_bool)
    }

    /// New message with `key` set, sharing this message's payload.
    pub fn with_header(&self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Message {
        let mut headers = self.headers.clone();
        headers.insert(key.into(), value.into());
        Message {
            payload: Arc::clone(&self.payload),
            headers,
        }
    }

    /// New message with `key` removed, sharing this message's payload.
    pub fn without_header(&self, key: &str) -> Message {
        let mut headers = self.headers.clone();
        headers.remove(key);
        Message {
            payload: Arc::clone(&self.payload),
            headers,
        }
    }
}
