//! End-to-end traffic over an intercepted channel: one send call should
//! leave exactly one linked producer/consumer span pair in the tracer.

use std::sync::Arc;

use channel_tracing::channel::{ChannelError, DirectChannel, MessageChannel};
use channel_tracing::codec::MessageHeaderCarrier;
use channel_tracing::context::{SpanContext, SpanId, TraceFlags, TraceId};
use channel_tracing::interceptor::{
    TracingChannelInterceptor, CONSUMED_HEADER, SENT_FROM_CLIENT_HEADER,
};
use channel_tracing::message::Message;
use channel_tracing::mock::MockTracer;
use channel_tracing::propagator::{B3Propagator, TracePropagator};
use channel_tracing::span::{tags, SpanAttribute, SpanKind};
use channel_tracing::tracer::Tracer;

fn traced_channel(name: &str) -> (Arc<MockTracer>, DirectChannel) {
    // RUST_LOG=channel_tracing=trace shows the interceptor's own diagnostics
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let tracer = Arc::new(MockTracer::new());
    let mut channel = DirectChannel::new(name);
    channel.add_interceptor(Arc::new(TracingChannelInterceptor::new(tracer.clone())));
    (tracer, channel)
}

fn ok_handler() -> Arc<dyn channel_tracing::channel::MessageHandler> {
    Arc::new(|_msg: &Message| -> Result<(), ChannelError> { Ok(()) })
}

#[test]
fn send_produces_a_linked_span_pair() {
    let (tracer, channel) = traced_channel("orders");
    channel.subscribe(ok_handler());

    channel
        .send(Message::new(b"order placed".as_slice()))
        .unwrap();

    let finished = tracer.finished_spans();
    assert_eq!(finished.len(), 2);
    assert!(tracer.active_span().is_none());

    // completion hooks close scopes LIFO: the consumer span finishes first
    let consumer = tracer.finished_span("receive:orders");
    let producer = tracer.finished_span("send:orders");

    assert_eq!(producer.kind, SpanKind::Producer);
    assert_eq!(consumer.kind, SpanKind::Consumer);

    // one trace, consumer following from the producer
    assert_eq!(consumer.context.trace_id, producer.context.trace_id);
    assert_eq!(consumer.parent_span_id(), Some(producer.context.span_id));
    assert_eq!(producer.parent_span_id(), None);
    assert!(producer.start_time <= consumer.start_time);

    for span in [&producer, &consumer] {
        assert_eq!(
            span.attribute(tags::COMPONENT),
            Some(&SpanAttribute::String("channel-tracing".to_string()))
        );
        assert_eq!(
            span.attribute(tags::MESSAGE_BUS_DESTINATION),
            Some(&SpanAttribute::String("orders".to_string()))
        );
    }
}

#[test]
fn externally_produced_message_continues_the_foreign_trace() {
    let (tracer, channel) = traced_channel("input");
    channel.subscribe(ok_handler());

    // a producer outside this process already injected its context
    let external = SpanContext::new(TraceId::new(), SpanId::new(), TraceFlags::SAMPLED);
    let mut carrier = MessageHeaderCarrier::new(&Message::new(b"payload".as_slice()));
    B3Propagator::new().inject(&external, &mut carrier).unwrap();

    channel.send(carrier.into_message()).unwrap();

    let finished = tracer.finished_spans();
    assert_eq!(finished.len(), 2);

    let producer = tracer.finished_span("send:input");
    assert_eq!(producer.context.trace_id, external.trace_id);
    assert_eq!(producer.parent_span_id(), Some(external.span_id));

    let consumer = tracer.finished_span("receive:input");
    assert_eq!(consumer.parent_span_id(), Some(producer.context.span_id));
}

#[test]
fn send_inside_an_active_span_parents_onto_it() {
    let (tracer, channel) = traced_channel("orders");
    channel.subscribe(ok_handler());

    let outer = tracer.start_span(channel_tracing::span::SpanBuilder::new("http-request"));
    tracer.activate(&outer, true);

    channel.send(Message::new(b"payload".as_slice())).unwrap();
    tracer.close_active_scope();

    let producer = tracer.finished_span("send:orders");
    assert_eq!(producer.parent_span_id(), Some(outer.context().span_id));
    assert_eq!(producer.context.trace_id, outer.context().trace_id);
}

#[test]
fn handler_failure_tags_both_spans_and_still_closes_scopes() {
    let (tracer, channel) = traced_channel("orders");
    channel.subscribe(Arc::new(|_msg: &Message| -> Result<(), ChannelError> {
        Err(ChannelError::Handler("deserialization failed".to_string()))
    }));

    let err = channel
        .send(Message::new(b"garbage".as_slice()))
        .unwrap_err();
    assert!(matches!(err, ChannelError::Handler(_)));

    let finished = tracer.finished_spans();
    assert_eq!(finished.len(), 2);
    assert!(tracer.active_span().is_none());

    assert_eq!(
        tracer.finished_span("receive:orders").attribute(tags::ERROR),
        Some(&SpanAttribute::Bool(true))
    );
    assert_eq!(
        tracer.finished_span("send:orders").attribute(tags::ERROR),
        Some(&SpanAttribute::Bool(true))
    );
}

#[test]
fn send_without_subscriber_tags_the_producer_span() {
    let (tracer, channel) = traced_channel("orders");

    let err = channel
        .send(Message::new(b"payload".as_slice()))
        .unwrap_err();
    assert!(matches!(err, ChannelError::Send(_)));

    let finished = tracer.finished_spans();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].name, "send:orders");
    assert_eq!(
        finished[0].attribute(tags::ERROR),
        Some(&SpanAttribute::Bool(true))
    );
    assert!(tracer.active_span().is_none());
}

#[test]
fn handler_sees_markers_but_no_leaked_client_marker() {
    let (tracer, channel) = traced_channel("orders");

    let seen: Arc<parking_lot::Mutex<Option<Message>>> =
        Arc::new(parking_lot::Mutex::new(None));
    let sink = seen.clone();
    channel.subscribe(Arc::new(move |msg: &Message| -> Result<(), ChannelError> {
        *sink.lock() = Some(msg.clone());
        Ok(())
    }));

    channel.send(Message::new(b"payload".as_slice())).unwrap();

    let received = seen.lock().take().unwrap();
    assert_eq!(
        received.bool_header(SENT_FROM_CLIENT_HEADER),
        None,
        "client marker must be stripped before the handler runs"
    );
    assert_eq!(received.bool_header(CONSUMED_HEADER), Some(true));
    assert_eq!(received.payload(), b"payload");
    assert_eq!(tracer.finished_spans().len(), 2);
}

#[test]
fn channel_reports_its_structured_name() {
    let (_tracer, channel) = traced_channel("orders");
    assert_eq!(channel.full_name(), Some("orders"));
    assert_eq!(channel.channel_name().as_str(), "orders");
}
