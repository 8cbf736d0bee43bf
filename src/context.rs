//! Per-call context: cancellation and distributed-trace propagation.
//!
//! Every [`Client`](crate::Client) operation takes a [`CallContext`]. It can
//! carry a [`CancellationToken`] that aborts the round trip, an OpenTelemetry
//! [`Context`] whose span is propagated to the server, and a propagator to use
//! instead of the process-wide one.

use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Injector, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{global, Context};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ambient state for a single API call.
///
/// # Examples
///
/// ```no_run
/// use arpa_client::{CallContext, Client};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), arpa_client::ApiError> {
/// let client = Client::new("https://arpa.example.com")?;
/// let token = CancellationToken::new();
/// let ctx = CallContext::new()
///     .with_cancellation(token.clone())
///     .with_trace_context(opentelemetry::Context::current());
///
/// // Cancelling from another task aborts the call.
/// tokio::spawn(async move { token.cancel() });
/// let result = client.get_admin_token(&ctx, "admin", "secret").await;
/// assert!(result.is_err_and(|e| e.is_cancelled()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct CallContext {
    cancellation: Option<CancellationToken>,
    trace: Option<Context>,
    propagator: Option<Arc<dyn TextMapPropagator + Send + Sync>>,
}

impl CallContext {
    /// Creates an empty context: no cancellation, ambient trace context,
    /// global propagator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts calls made with this context once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Propagates the span of `cx` instead of the ambient one.
    pub fn with_trace_context(mut self, cx: Context) -> Self {
        self.trace = Some(cx);
        self
    }

    /// Uses `propagator` instead of the global text-map propagator.
    pub fn with_propagator<P>(mut self, propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        self.propagator = Some(Arc::new(propagator));
        self
    }

    /// Returns the cancellation token, if one was attached.
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Returns `true` if the attached token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Returns the attached trace context, or the current one.
    pub fn trace_context(&self) -> Context {
        self.trace.clone().unwrap_or_else(Context::current)
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("cancellation", &self.cancellation)
            .field("has_trace_context", &self.trace.is_some())
            .field("has_propagator", &self.propagator.is_some())
            .finish()
    }
}

/// Adapter for injecting trace context into HTTP headers.
struct HeadersInjector<'a>(&'a mut HeaderMap);

impl Injector for HeadersInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        // Unrepresentable keys or values are dropped; propagation is best effort.
        if let Ok(name) = HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

/// Injects the context's span into `headers`.
///
/// Does nothing when the trace context holds no valid span. Otherwise the
/// context's own propagator is used, falling back to the one registered with
/// [`opentelemetry::global::set_text_map_propagator`].
pub fn inject_tracing_headers(ctx: &CallContext, headers: &mut HeaderMap) {
    let cx = ctx.trace_context();
    if !cx.span().span_context().is_valid() {
        return;
    }

    let mut injector = HeadersInjector(headers);
    match &ctx.propagator {
        Some(propagator) => propagator.inject_context(&cx, &mut injector),
        None => global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&cx, &mut injector)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    fn traced() -> Context {
        let span_context = SpanContext::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        Context::new().with_remote_span_context(span_context)
    }

    #[test]
    fn test_no_span_leaves_headers_untouched() {
        let ctx = CallContext::new()
            .with_trace_context(Context::new())
            .with_propagator(TraceContextPropagator::new());
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        inject_tracing_headers(&ctx, &mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["content-type"], "application/json");
    }

    #[test]
    fn test_span_is_injected_with_context_propagator() {
        let ctx = CallContext::new()
            .with_trace_context(traced())
            .with_propagator(TraceContextPropagator::new());
        let mut headers = HeaderMap::new();

        inject_tracing_headers(&ctx, &mut headers);

        assert_eq!(
            headers["traceparent"],
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
        );
    }

    #[test]
    fn test_injector_skips_invalid_entries() {
        let mut headers = HeaderMap::new();
        let mut injector = HeadersInjector(&mut headers);
        injector.set("bad header", "x".to_string());
        injector.set("x-ok", "line\nbreak".to_string());
        injector.set("x-good", "value".to_string());
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-good"], "value");
    }

    #[test]
    fn test_cancellation_state() {
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancellation(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(!CallContext::new().is_cancelled());
    }
}
