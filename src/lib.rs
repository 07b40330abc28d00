//! Trace-context propagation across message-channel boundaries.
//!
//! A message bus breaks the call stack: the code that sends a message and
//! the code that handles it run in different units of work, often in
//! different processes. This crate carries a trace across that gap by
//! writing span context into message headers on the producer side and
//! reading it back on the consumer side, bridging header-key transports
//! that reject dashes along the way.
//!
//! The two central pieces are:
//!
//! - [`codec::MessageHeaderCarrier`], a propagation carrier over a
//!   message's headers that reversibly escapes dashes in header keys and
//!   merges injected context back without disturbing typed header values;
//! - [`interceptor::TracingChannelInterceptor`], a channel interceptor
//!   that opens `send:` and `receive:` spans around channel traffic and
//!   pairs each with the completion callback that closes it.
//!
//! ```
//! use std::sync::Arc;
//! use channel_tracing::channel::{ChannelError, DirectChannel};
//! use channel_tracing::interceptor::TracingChannelInterceptor;
//! use channel_tracing::message::Message;
//! use channel_tracing::mock::MockTracer;
//!
//! let tracer = Arc::new(MockTracer::new());
//! let mut channel = DirectChannel::new("orders");
//! channel.add_interceptor(Arc::new(TracingChannelInterceptor::new(tracer.clone())));
//! channel.subscribe(Arc::new(|_msg: &Message| -> Result<(), ChannelError> { Ok(()) }));
//!
//! channel.send(Message::new(b"order placed".as_slice())).unwrap();
//!
//! // one producer span, one consumer span, linked
//! assert_eq!(tracer.finished_spans().len(), 2);
//! ```

pub mod carrier;
pub mod channel;
pub mod codec;
pub mod context;
pub mod interceptor;
pub mod message;
pub mod mock;
pub mod propagator;
pub mod span;
pub mod tracer;

pub use carrier::{CarrierError, HeaderCarrier};
pub use channel::{ChannelError, ChannelInterceptor, ChannelName, DirectChannel, MessageChannel};
pub use codec::{MessageHeaderCarrier, TransportHeaderCarrier};
pub use context::{SpanContext, SpanId, TraceFlags, TraceId};
pub use interceptor::TracingChannelInterceptor;
pub use message::{HeaderValue, Message};
pub use mock::MockTracer;
pub use propagator::{B3Propagator, TracePropagator};
pub use span::{Reference, Span, SpanBuilder, SpanData, SpanKind};
pub use tracer::Tracer;
