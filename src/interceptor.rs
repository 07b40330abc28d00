//! The channel-interception state machine.
//!
//! One interceptor instance watches every message crossing a channel and
//! decides, per message, which side of the bus it is on:
//!
//! - no marker header → the message originates here: open a producer span
//!   named `send:{channel}`, inject its context into the headers, and mark
//!   the message as sent-from-client;
//! - marker header present → the message is being dispatched to a handler:
//!   open a consumer span named `receive:{channel}` that follows from the
//!   context carried in the headers, and swap the marker for the consumed
//!   marker.
//!
//! State has to ride on the message itself because nothing else survives the
//! asynchronous gap between the send call and the completion callback — the
//! two marker headers are that state. The "currently open scope" lives in
//! the tracer, and the completion hook closes exactly the scope its pre-send
//! opened.

use crate::channel::{ChannelError, ChannelInterceptor, MessageChannel};
use crate::codec::MessageHeaderCarrier;
use crate::message::Message;
use crate::span::{tags, SpanBuilder, SpanKind};
use crate::tracer::Tracer;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Value of the `component` tag on every span this interceptor opens.
pub const COMPONENT_NAME: &str = "channel-tracing";

/// Marker header: this message already carries a producer span opened by a
/// client-side send. Private to the instrumentation.
pub const SENT_FROM_CLIENT_HEADER: &str = "trace_sent_from_client";

/// Marker header: this message has been dispatched to a handler and is
/// treated as consumed at completion time. Private to the instrumentation.
pub const CONSUMED_HEADER: &str = "trace_message_consumed";

/// Which side of the bus a message is on at completion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageRole {
    Produced,
    Consumed,
}

/// Channel interceptor that links a producer's and a consumer's units of
/// work into one causal trace.
pub struct TracingChannelInterceptor {
    tracer: Arc<dyn Tracer>,
}

impl TracingChannelInterceptor {
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self { tracer }
    }

    /// Completion-time classification. The consumed marker takes precedence
    /// when both markers are present on one message.
    fn completion_role(message: &Message) -> MessageRole {
        if message.bool_header(CONSUMED_HEADER).unwrap_or(false) {
            MessageRole::Consumed
        } else {
            MessageRole::Produced
        }
    }

    /// Consumer side: the message was marked by a client-side send. Continue
    /// the trace with a `receive:` span following from the carried context.
    fn start_consumer_span(&self, message: Message, channel_name: &str) -> Message {
        let carrier = MessageHeaderCarrier::new(&message);
        let parent = self.tracer.extract(&carrier);
        if parent.is_none() {
            // tolerated: the span simply has no remote parent
            trace!(channel = channel_name, "no trace context in message headers");
        }

        let mut builder = SpanBuilder::new(format!("receive:{channel_name}"))
            .with_kind(SpanKind::Consumer)
            .with_tag(tags::COMPONENT, COMPONENT_NAME)
            .with_tag(tags::MESSAGE_BUS_DESTINATION, channel_name);
        if let Some(parent) = parent {
            builder = builder.follows_from(parent);
        }

        let span = self.tracer.start_span(builder);
        debug!(
            channel = channel_name,
            span_id = %span.context().span_id,
            "opened consumer span"
        );
        self.tracer.activate(&span, true);

        message
            .without_header(SENT_FROM_CLIENT_HEADER)
            .with_header(CONSUMED_HEADER, true)
    }

    /// Producer side: the message originates here. Open a `send:` span,
    /// parented on any context already carried in the headers (a message
    /// ingested from an external producer), otherwise on the tracer's
    /// ambient active span, and inject the new span's context.
    fn start_producer_span(&self, message: Message, channel_name: &str) -> Message {
        let mut carrier = MessageHeaderCarrier::new(&message);

        let mut builder = SpanBuilder::new(format!("send:{channel_name}"))
            .with_kind(SpanKind::Producer)
            .with_tag(tags::COMPONENT, COMPONENT_NAME)
            .with_tag(tags::MESSAGE_BUS_DESTINATION, channel_name);
        if let Some(extracted) = self.tracer.extract(&carrier) {
            builder = builder.child_of(extracted);
        }

        let span = self.tracer.start_span(builder);
        debug!(
            channel = channel_name,
            span_id = %span.context().span_id,
            "opened producer span"
        );
        if let Err(err) = self.tracer.inject(&span.context(), &mut carrier) {
            // the message-backed carrier is writable; a failure here means a
            // foreign carrier was wired in by mistake
            warn!(channel = channel_name, %err, "could not inject trace context");
        }
        self.tracer.activate(&span, true);

        carrier
            .into_message()
            .with_header(SENT_FROM_CLIENT_HEADER, true)
    }
}

impl ChannelInterceptor for TracingChannelInterceptor {
    fn pre_send(&self, message: Message, channel: &dyn MessageChannel) -> Message {
        let name = channel.channel_name();
        if message
            .bool_header(SENT_FROM_CLIENT_HEADER)
            .unwrap_or(false)
        {
            self.start_consumer_span(message, name.as_str())
        } else {
            self.start_producer_span(message, name.as_str())
        }
    }

    fn after_send_completion(
        &self,
        message: &Message,
        channel: &dyn MessageChannel,
        _sent: bool,
        failure: Option<&ChannelError>,
    ) {
        let Some(span) = self.tracer.active_span() else {
            // no span was opened for this message (e.g. the channel was
            // filtered out upstream)
            return;
        };
        if let Some(err) = failure {
            span.set_tag(tags::ERROR, true);
            debug!(channel = %channel.channel_name(), %err, "send completed with failure");
        }
        trace!(
            channel = %channel.channel_name(),
            role = ?Self::completion_role(message),
            "closing scope"
        );
        self.tracer.close_active_scope();
    }

    fn before_handle(&self, _message: &Message, channel: &dyn MessageChannel) {
        if let Some(span) = self.tracer.active_span() {
            trace!(
                channel = %channel.channel_name(),
                span_id = %span.context().span_id,
                "handler starting"
            );
        }
    }

    fn after_message_handled(
        &self,
        _message: &Message,
        channel: &dyn MessageChannel,
        failure: Option<&ChannelError>,
    ) {
        let Some(span) = self.tracer.active_span() else {
            return;
        };
        if let Some(err) = failure {
            span.set_tag(tags::ERROR, true);
            debug!(channel = %channel.channel_name(), %err, "handler failed");
        }
    }
}
