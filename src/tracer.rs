//! The tracer capability the channel interceptor consumes.
//!
//! The interceptor never stores spans or scopes itself: the tracer owns the
//! "currently active scope" for the logically-current unit of work, and the
//! interceptor only opens it ([`Tracer::activate`]) and closes it
//! ([`Tracer::close_active_scope`]). Pairing therefore stays correct across
//! an asynchronous handoff as long as the tracer carries that state along.

use crate::carrier::{CarrierError, HeaderCarrier};
use crate::context::SpanContext;
use crate::span::{Span, SpanBuilder};

pub trait Tracer: Send + Sync {
    /// Start a span described by `builder`. When the builder carries no
    /// explicit reference, the currently active span (if any) becomes the
    /// implicit parent.
    fn start_span(&self, builder: SpanBuilder) -> Span;

    /// Make `span` the currently active scope. With `finish_on_close`, the
    /// span is finished when that scope is closed.
    fn activate(&self, span: &Span, finish_on_close: bool);

    /// The span of the currently active scope, if any.
    fn active_span(&self) -> Option<Span>;

    /// Close the currently active scope; a no-op when none is open. Finishes
    /// the scope's span only when it was activated with `finish_on_close`.
    fn close_active_scope(&self);

    /// Write `context` into `carrier` in the tracer's wire format.
    fn inject(
        &self,
        context: &SpanContext,
        carrier: &mut dyn HeaderCarrier,
    ) -> Result<(), CarrierError>;

    /// Read a context back out of `carrier`; `None` when absent or
    /// malformed — never an error.
    fn extract(&self, carrier: &dyn HeaderCarrier) -> Option<SpanContext>;
}
