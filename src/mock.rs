//! In-memory tracer for tests.
//!
//! [`MockTracer`] records every finished span and keeps the active-scope
//! state as an explicit stack instead of thread-local ambient storage, so a
//! test can drive one logical unit of work and then inspect exactly what the
//! instrumentation produced.

use crate::carrier::{CarrierError, HeaderCarrier};
use crate::context::{SpanContext, SpanId, TraceFlags, TraceId};
use crate::propagator::{B3Propagator, TracePropagator};
use crate::span::{Span, SpanBuilder, SpanData};
use crate::tracer::Tracer;
use parking_lot::Mutex;

struct ScopeEntry {
    span: Span,
    finish_on_close: bool,
}

pub struct MockTracer {
    finished: Mutex<Vec<SpanData>>,
    /// Scope stack for the single logical unit of work a test drives.
    /// Cross-context isolation is the caller's contract, not enforced here.
    scopes: Mutex<Vec<ScopeEntry>>,
    propagator: Box<dyn TracePropagator>,
}

impl MockTracer {
    /// Tracer propagating in the B3 multi-header format.
    pub fn new() -> Self {
        Self::with_propagator(Box::new(B3Propagator::new()))
    }

    pub fn with_propagator(propagator: Box<dyn TracePropagator>) -> Self {
        Self {
            finished: Mutex::new(Vec::new()),
            scopes: Mutex::new(Vec::new()),
            propagator,
        }
    }

    /// Snapshot of every span finished so far, in finish order.
    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.finished.lock().clone()
    }

    /// Find a finished span by name; panics with the name when missing so
    /// test failures read well.
    pub fn finished_span(&self, name: &str) -> SpanData {
        self.finished
            .lock()
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("no finished span named {name:?}"))
    }

    /// Drop all recorded spans and any open scopes.
    pub fn reset(&self) {
        self.finished.lock().clear();
        self.scopes.lock().clear();
    }
}

impl Default for MockTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer for MockTracer {
    fn start_span(&self, mut builder: SpanBuilder) -> Span {
        if builder.reference.is_none() {
            if let Some(active) = self.active_span() {
                builder = builder.child_of(active.context());
            }
        }

        let (trace_id, flags) = match &builder.reference {
            Some(reference) => {
                let parent = reference.context();
                (parent.trace_id, parent.trace_flags)
            }
            None => (TraceId::new(), TraceFlags::SAMPLED),
        };
        let context = SpanContext::new(trace_id, SpanId::new(), flags);

        Span::start(
            builder.name,
            context,
            builder.reference,
            builder.kind,
            builder.attributes,
        )
    }

    fn activate(&self, span: &Span, finish_on_close: bool) {
        self.scopes.lock().push(ScopeEntry {
            span: span.clone(),
            finish_on_close,
        });
    }

    fn active_span(&self) -> Option<Span> {
        self.scopes.lock().last().map(|entry| entry.span.clone())
    }

    fn close_active_scope(&self) {
        let Some(entry) = self.scopes.lock().pop() else {
            return;
        };
        if entry.finish_on_close {
            entry.span.end();
            self.finished.lock().push(entry.span.data());
        }
    }

    fn inject(
        &self,
        context: &SpanContext,
        carrier: &mut dyn HeaderCarrier,
    ) -> Result<(), CarrierError> {
        self.propagator.inject(context, carrier)
    }

    fn extract(&self, carrier: &dyn HeaderCarrier) -> Option<SpanContext> {
        self.propagator.extract(carrier)
    }
}
