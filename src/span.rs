//! Span types: the timed unit of work a tracer produces.
//!
//! The interceptor only ever builds spans through [`SpanBuilder`] and tags
//! them through the shared [`Span`] handle; storage and export of finished
//! [`SpanData`] belong to the tracer implementation.

use crate::context::{SpanContext, SpanId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Well-known tag keys emitted by the channel instrumentation.
pub mod tags {
    /// Fixed identifier of the instrumentation that produced a span.
    pub const COMPONENT: &str = "component";
    /// Name of the channel a message was sent to or received from.
    pub const MESSAGE_BUS_DESTINATION: &str = "message_bus.destination";
    /// Boolean marker set when the traced operation failed.
    pub const ERROR: &str = "error";
}

/// Role of a span relative to the message bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpanKind {
    #[default]
    Internal,
    Producer,
    Consumer,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanKind::Internal => write!(f, "internal"),
            SpanKind::Producer => write!(f, "producer"),
            SpanKind::Consumer => write!(f, "consumer"),
        }
    }
}

/// A typed tag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpanAttribute {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for SpanAttribute {
    fn from(v: &str) -> Self {
        SpanAttribute::String(v.to_string())
    }
}

impl From<String> for SpanAttribute {
    fn from(v: String) -> Self {
        SpanAttribute::String(v)
    }
}

impl From<i64> for SpanAttribute {
    fn from(v: i64) -> Self {
        SpanAttribute::Int(v)
    }
}

impl From<f64> for SpanAttribute {
    fn from(v: f64) -> Self {
        SpanAttribute::Float(v)
    }
}

impl From<bool> for SpanAttribute {
    fn from(v: bool) -> Self {
        SpanAttribute::Bool(v)
    }
}

/// Causal reference from a new span to an existing context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reference {
    /// The referenced context is a blocking parent.
    ChildOf(SpanContext),
    /// The referenced work is causally prior but the new span does not block
    /// on it — the producer/consumer relation across a message bus.
    FollowsFrom(SpanContext),
}

impl Reference {
    pub fn context(&self) -> &SpanContext {
        match self {
            Reference::ChildOf(ctx) | Reference::FollowsFrom(ctx) => ctx,
        }
    }
}

/// Immutable record of a finished (or in-flight) span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanData {
    pub context: SpanContext,
    pub reference: Option<Reference>,
    pub name: String,
    pub kind: SpanKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub attributes: HashMap<String, SpanAttribute>,
}

impl SpanData {
    /// Id of the referenced parent context, regardless of reference kind.
    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.reference.as_ref().map(|r| r.context().span_id)
    }

    pub fn attribute(&self, key: &str) -> Option<&SpanAttribute> {
        self.attributes.get(key)
    }
}

struct SpanState {
    data: SpanData,
    ended: bool,
}

/// Shared handle to a live span. Cloning shares the same underlying state.
#[derive(Clone)]
pub struct Span {
    inner: Arc<RwLock<SpanState>>,
}

impl Span {
    pub(crate) fn start(
        name: String,
        context: SpanContext,
        reference: Option<Reference>,
        kind: SpanKind,
        attributes: HashMap<String, SpanAttribute>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SpanState {
                data: SpanData {
                    context,
                    reference,
                    name,
                    kind,
                    start_time: Utc::now(),
                    end_time: None,
                    attributes,
                },
                ended: false,
            })),
        }
    }

    pub fn context(&self) -> SpanContext {
        self.inner.read().data.context.clone()
    }

    pub fn name(&self) -> String {
        self.inner.read().data.name.clone()
    }

    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<SpanAttribute>) {
        let mut state = self.inner.write();
        if !state.ended {
            state.data.attributes.insert(key.into(), value.into());
        }
    }

    pub fn is_ended(&self) -> bool {
        self.inner.read().ended
    }

    /// Mark the span finished. Later calls are no-ops; the first end time
    /// sticks.
    pub fn end(&self) {
        let mut state = self.inner.write();
        if !state.ended {
            state.ended = true;
            state.data.end_time = Some(Utc::now());
        }
    }

    pub fn data(&self) -> SpanData {
        self.inner.read().data.clone()
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Span")
            .field("name", &state.data.name)
            .field("context", &state.data.context)
            .field("ended", &state.ended)
            .finish()
    }
}

/// Description of a span to be started by a tracer.
#[derive(Debug, Clone)]
pub struct SpanBuilder {
    pub name: String,
    pub kind: SpanKind,
    pub reference: Option<Reference>,
    pub attributes: HashMap<String, SpanAttribute>,
}

impl SpanBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SpanKind::Internal,
            reference: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn child_of(mut self, context: SpanContext) -> Self {
        self.reference = Some(Reference::ChildOf(context));
        self
    }

    pub fn follows_from(mut self, context: SpanContext) -> Self {
        self.reference = Some(Reference::FollowsFrom(context));
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<SpanAttribute>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
