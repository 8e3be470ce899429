//! Prometheus metrics for the control API.
//!
//! [`HttpMetrics`] owns a private registry holding the
//! `http_request_duration_ms` histogram (labelled by method, route, and
//! status code) and, on Linux, the standard process collector.
//! [`track_metrics`] is installed as a route layer so every matched
//! request is timed; `GET /metrics` renders the registry in the text
//! exposition format.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{HistogramOpts, HistogramVec, Registry, TextEncoder};

use crate::error::GatewayError;
use crate::state::AppState;

/// Histogram name, kept compatible with existing dashboards.
pub const REQUEST_DURATION_METRIC: &str = "http_request_duration_ms";

/// Bucket bounds in milliseconds, from 0.1 ms to 5 s.
const DURATION_BUCKETS_MS: [f64; 10] = [
    0.1, 5.0, 15.0, 50.0, 100.0, 300.0, 500.0, 1000.0, 3000.0, 5000.0,
];

/// Request metrics and the registry they are exported from.
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    request_duration: HistogramVec,
}

impl HttpMetrics {
    /// Create a registry with the request histogram and default collectors.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Metrics`] if a collector cannot be
    /// registered.
    pub fn new() -> Result<Self, GatewayError> {
        let registry = Registry::new();

        let opts = HistogramOpts::new(REQUEST_DURATION_METRIC, "Duration of HTTP requests in ms")
            .buckets(DURATION_BUCKETS_MS.to_vec());
        let request_duration = HistogramVec::new(opts, &["method", "route", "code"])
            .map_err(|e| GatewayError::Metrics(format!("histogram: {e}")))?;
        registry
            .register(Box::new(request_duration.clone()))
            .map_err(|e| GatewayError::Metrics(format!("register histogram: {e}")))?;

        #[cfg(target_os = "linux")]
        registry
            .register(Box::new(
                prometheus::process_collector::ProcessCollector::for_self(),
            ))
            .map_err(|e| GatewayError::Metrics(format!("register process collector: {e}")))?;

        Ok(Self {
            registry,
            request_duration,
        })
    }

    /// Record one completed request.
    pub fn observe(&self, method: &str, route: &str, code: u16, elapsed: Duration) {
        let code = code.to_string();
        self.request_duration
            .with_label_values(&[method, route, code.as_str()])
            .observe(elapsed.as_secs_f64() * 1000.0);
    }

    /// Render every registered metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Metrics`] if encoding fails.
    pub fn render(&self) -> Result<String, GatewayError> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(|e| GatewayError::Metrics(format!("encode: {e}")))
    }
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetrics")
            .field("families", &self.registry.gather().len())
            .finish_non_exhaustive()
    }
}

/// Route layer that times each request.
///
/// The `route` label is the matched route template, so path parameters
/// and unknown paths cannot grow the label set.
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_owned(), |p| p.as_str().to_owned());

    let response = next.run(request).await;

    state
        .metrics
        .observe(&method, &route, response.status().as_u16(), start.elapsed());
    response
}
