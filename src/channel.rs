//! Message-channel abstractions and an in-process direct channel.
//!
//! [`ChannelInterceptor`] is the contract the tracing instrumentation plugs
//! into: a pre-send hook, a post-send completion hook, and a pair of handler
//! lifecycle hooks. [`DirectChannel`] is a synchronous in-process channel
//! that drives the full hook sequence around a subscribed handler — the
//! producer hop on `send`, then the consumer hop on dispatch — which is the
//! same double-interception a brokered binder performs on its output and
//! input channels.

use crate::message::Message;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure observed by the channel or its handler. Interceptors only look at
/// these; they never swallow or replace them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("send failed: {0}")]
    Send(String),
    #[error("handler failed: {0}")]
    Handler(String),
}

/// Channel identity, resolved once at interception time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelName {
    /// The channel exposes a structured name.
    Named(String),
    /// No structured name; the channel's generic string form stands in.
    Anonymous(String),
}

impl ChannelName {
    pub fn as_str(&self) -> &str {
        match self {
            ChannelName::Named(name) | ChannelName::Anonymous(name) => name.as_str(),
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel messages are sent through.
pub trait MessageChannel: Send + Sync {
    /// Structured channel name, when the implementation has one.
    fn full_name(&self) -> Option<&str> {
        None
    }

    /// Generic string form used when no structured name is available.
    fn describe(&self) -> String;

    /// Resolve this channel's identity: the structured name when present,
    /// the generic string form otherwise. Total — never fails.
    fn channel_name(&self) -> ChannelName {
        match self.full_name() {
            Some(name) => ChannelName::Named(name.to_string()),
            None => ChannelName::Anonymous(self.describe()),
        }
    }
}

/// Hooks wrapped around channel sends and handler invocations.
///
/// Callers guarantee that every `pre_send` is paired with exactly one
/// `after_send_completion` on a call path where any scope state established
/// by that `pre_send` is still current.
pub trait ChannelInterceptor: Send + Sync {
    /// Invoked once per outgoing message before it reaches the bus. Returns
    /// the (possibly re-headed) message to hand over.
    fn pre_send(&self, message: Message, channel: &dyn MessageChannel) -> Message;

    /// Invoked after the send attempt completes, successfully or not.
    fn after_send_completion(
        &self,
        message: &Message,
        channel: &dyn MessageChannel,
        sent: bool,
        failure: Option<&ChannelError>,
    );

    /// Invoked just before the handler runs on the consumer side.
    fn before_handle(&self, message: &Message, channel: &dyn MessageChannel);

    /// Invoked after the handler ran; `failure` carries its error, if any.
    fn after_message_handled(
        &self,
        message: &Message,
        channel: &dyn MessageChannel,
        failure: Option<&ChannelError>,
    );
}

/// Consumer-side message handler.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &Message) -> Result<(), ChannelError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) -> Result<(), ChannelError> + Send + Sync,
{
    fn handle(&self, message: &Message) -> Result<(), ChannelError> {
        self(message)
    }
}

/// Synchronous in-process channel with an interceptor chain and a single
/// subscribed handler.
pub struct DirectChannel {
    name: String,
    interceptors: Vec<Arc<dyn ChannelInterceptor>>,
    handler: RwLock<Option<Arc<dyn MessageHandler>>>,
}

impl DirectChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interceptors: Vec::new(),
            handler: RwLock::new(None),
        }
    }

    /// Append an interceptor. Pre-send hooks run in registration order,
    /// completion hooks in reverse.
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn ChannelInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn subscribe(&self, handler: Arc<dyn MessageHandler>) {
        *self.handler.write() = Some(handler);
    }

    /// Send a message: producer hop, synchronous "bus" dispatch to the
    /// subscribed handler (the consumer hop), then producer completion.
    pub fn send(&self, message: Message) -> Result<(), ChannelError> {
        let message = self.run_pre_send(message);
        tracing::trace!(channel = %self.name, "dispatching message");
        let result = self.deliver(message.clone());
        self.run_after_send_completion(&message, result.is_ok(), result.as_ref().err());
        result
    }

    /// The consumer hop: a second interception pass, then the handler,
    /// bracketed by the lifecycle hooks.
    fn deliver(&self, message: Message) -> Result<(), ChannelError> {
        let handler = self.handler.read().clone().ok_or_else(|| {
            ChannelError::Send(format!("no handler subscribed to channel {}", self.name))
        })?;

        let received = self.run_pre_send(message);
        self.run_before_handle(&received);
        let outcome = handler.handle(&received);
        self.run_after_message_handled(&received, outcome.as_ref().err());
        self.run_after_send_completion(&received, outcome.is_ok(), outcome.as_ref().err());
        outcome
    }

    fn run_pre_send(&self, mut message: Message) -> Message {
        for interceptor in &self.interceptors {
            message = interceptor.pre_send(message, self);
        }
        message
    }

    fn run_after_send_completion(
        &self,
        message: &Message,
        sent: bool,
        failure: Option<&ChannelError>,
    ) {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.after_send_completion(message, self, sent, failure);
        }
    }

    fn run_before_handle(&self, message: &Message) {
        for interceptor in &self.interceptors {
            interceptor.before_handle(message, self);
        }
    }

    fn run_after_message_handled(&self, message: &Message, failure: Option<&ChannelError>) {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.after_message_handled(message, self, failure);
        }
    }
}

impl MessageChannel for DirectChannel {
    fn full_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn describe(&self) -> String {
        format!("channel[{}]", self.name)
    }
}
