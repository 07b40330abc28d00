//! Wire formats for carrying a [`SpanContext`] in headers.
//!
//! The default format is the multi-header B3 family. Its header names all
//! contain `-`, which is exactly the character some transports reject — the
//! codec's key escaping exists so these names survive such transports.

use crate::carrier::{CarrierError, HeaderCarrier};
use crate::context::{SpanContext, SpanId, TraceFlags, TraceId};

/// Inject/extract protocol over a [`HeaderCarrier`].
pub trait TracePropagator: Send + Sync {
    fn inject(
        &self,
        context: &SpanContext,
        carrier: &mut dyn HeaderCarrier,
    ) -> Result<(), CarrierError>;

    fn extract(&self, carrier: &dyn HeaderCarrier) -> Option<SpanContext>;

    /// Header names this propagator reads and writes.
    fn fields(&self) -> &[&str];
}

/// Multi-header B3 propagation format.
#[derive(Debug, Default)]
pub struct B3Propagator;

impl B3Propagator {
    pub const X_B3_TRACE_ID: &'static str = "x-b3-traceid";
    pub const X_B3_SPAN_ID: &'static str = "x-b3-spanid";
    pub const X_B3_SAMPLED: &'static str = "x-b3-sampled";

    pub fn new() -> Self {
        Self
    }
}

impl TracePropagator for B3Propagator {
    fn inject(
        &self,
        context: &SpanContext,
        carrier: &mut dyn HeaderCarrier,
    ) -> Result<(), CarrierError> {
        if !context.is_valid() {
            return Ok(());
        }
        carrier.set(Self::X_B3_TRACE_ID, context.trace_id.to_hex())?;
        carrier.set(Self::X_B3_SPAN_ID, context.span_id.to_hex())?;
        carrier.set(
            Self::X_B3_SAMPLED,
            if context.is_sampled() { "1" } else { "0" }.to_string(),
        )?;
        Ok(())
    }

    fn extract(&self, carrier: &dyn HeaderCarrier) -> Option<SpanContext> {
        let trace_id = carrier
            .get(Self::X_B3_TRACE_ID)
            .and_then(|v| TraceId::from_hex(v).ok())?;
        let span_id = carrier
            .get(Self::X_B3_SPAN_ID)
            .and_then(|v| SpanId::from_hex(v).ok())?;

        if !trace_id.is_valid() || !span_id.is_valid() {
            return None;
        }

        // absent sampled header means sampled
        let flags = match carrier.get(Self::X_B3_SAMPLED) {
            Some("0") | Some("false") => TraceFlags::NONE,
            _ => TraceFlags::SAMPLED,
        };

        Some(SpanContext::new(trace_id, span_id, flags))
    }

    fn fields(&self) -> &[&str] {
        &[
            Self::X_B3_TRACE_ID,
            Self::X_B3_SPAN_ID,
            Self::X_B3_SAMPLED,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn inject_extract_round_trip() {
        let context = SpanContext::new(
            TraceId::from_hex("463ac35c9f6413ad48485a3953bb6124").unwrap(),
            SpanId::from_hex("0020000000000001").unwrap(),
            TraceFlags::SAMPLED,
        );

        let propagator = B3Propagator::new();
        let mut carrier: HashMap<String, String> = HashMap::new();
        propagator.inject(&context, &mut carrier).unwrap();

        assert_eq!(
            HeaderCarrier::get(&carrier, B3Propagator::X_B3_SAMPLED),
            Some("1")
        );

        let extracted = propagator.extract(&carrier).unwrap();
        assert_eq!(extracted, context);
    }

    #[test]
    fn extract_defaults_to_sampled() {
        let mut carrier = HashMap::new();
        carrier.insert(
            B3Propagator::X_B3_TRACE_ID.to_string(),
            "463ac35c9f6413ad48485a3953bb6124".to_string(),
        );
        carrier.insert(
            B3Propagator::X_B3_SPAN_ID.to_string(),
            "0020000000000001".to_string(),
        );

        let context = B3Propagator::new().extract(&carrier).unwrap();
        assert!(context.is_sampled());
    }

    #[test]
    fn extract_missing_or_malformed_yields_none() {
        let propagator = B3Propagator::new();
        assert!(propagator.extract(&HashMap::<String, String>::new()).is_none());

        let mut carrier = HashMap::new();
        carrier.insert(
            B3Propagator::X_B3_TRACE_ID.to_string(),
            "not-hex".to_string(),
        );
        assert!(propagator.extract(&carrier).is_none());
    }

    #[test]
    fn invalid_context_is_not_injected() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        B3Propagator::new()
            .inject(&SpanContext::invalid(), &mut carrier)
            .unwrap();
        assert!(carrier.is_empty());
    }
}
