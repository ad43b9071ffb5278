//! # Prometheus HTTP Metrics
//!
//! Request counters and latency histograms recorded by a middleware layer,
//! plus domain gauges (users, vault items, releases by status) that the
//! `/metrics` handler refreshes on scrape.
//!
//! Path labels are normalized: UUID segments and verification tokens
//! collapse to placeholders so the label space stays bounded.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Registry,
    TextEncoder,
};

/// Shared metrics handle. Cheap to clone; all counters live in the inner
/// registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
    users_total: IntGauge,
    vault_items_total: IntGauge,
    releases_total: IntGaugeVec,
}

impl ApiMetrics {
    /// Create a fresh registry with all Vigil metrics registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            opts!("vigil_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("valid metric definition");

        let http_request_duration_seconds = HistogramVec::new(
            histogram_opts!(
                "vigil_http_request_duration_seconds",
                "HTTP request latency in seconds"
            ),
            &["method", "path"],
        )
        .expect("valid metric definition");

        let http_errors_total = IntCounterVec::new(
            opts!("vigil_http_errors_total", "HTTP responses with status >= 400"),
            &["method", "path", "status"],
        )
        .expect("valid metric definition");

        let users_total =
            IntGauge::with_opts(opts!("vigil_users_total", "Registered user accounts"))
                .expect("valid metric definition");

        let vault_items_total = IntGauge::with_opts(opts!(
            "vigil_vault_items_total",
            "Encrypted vault items across all users"
        ))
        .expect("valid metric definition");

        let releases_total = IntGaugeVec::new(
            opts!("vigil_releases_total", "Release records by status"),
            &["status"],
        )
        .expect("valid metric definition");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(users_total.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(vault_items_total.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(releases_total.clone()))
            .expect("metric registers once");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                users_total,
                vault_items_total,
                releases_total,
            }),
        }
    }

    /// Record one finished request.
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_label = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_label])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_label])
                .inc();
        }
    }

    /// Refresh the domain gauges. Called from the `/metrics` handler so
    /// scrapes always see current store counts without per-write overhead.
    pub fn update_domain_gauges(&self, state: &crate::state::AppState) {
        self.inner.users_total.set(state.users.count() as i64);
        self.inner
            .vault_items_total
            .set(state.vault.snapshot_items().len() as i64);

        let releases = state.releases.snapshot();
        for status in ["PENDING", "IN_PROGRESS", "COMPLETED", "FAILED"] {
            let count = releases
                .iter()
                .filter(|r| r.status.as_str() == status)
                .count();
            self.inner
                .releases_total
                .with_label_values(&[status])
                .set(count as i64);
        }
    }

    /// Encode the registry in Prometheus text exposition format.
    pub fn gather_and_encode(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse high-cardinality path segments into placeholders.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else if looks_like_token(segment) {
                "{token}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Verification tokens are 32 random bytes, base64url: 43 chars, no pad.
fn looks_like_token(segment: &str) -> bool {
    segment.len() >= 40
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Middleware recording request count, latency, and error count.
///
/// Reads the [`ApiMetrics`] handle from request extensions; requests
/// arriving without one pass through unrecorded.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    let start = Instant::now();
    let response = next.run(request).await;

    if let Some(metrics) = metrics {
        metrics.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_replaces_uuids() {
        assert_eq!(
            normalize_path("/legacy/550e8400-e29b-41d4-a716-446655440000"),
            "/legacy/{id}"
        );
        assert_eq!(
            normalize_path("/api/obligations/550e8400-e29b-41d4-a716-446655440000/settle"),
            "/api/obligations/{id}/settle"
        );
    }

    #[test]
    fn normalize_path_replaces_tokens() {
        let token = "A".repeat(43);
        assert_eq!(
            normalize_path(&format!("/api/trusted-person/verify/{token}")),
            "/api/trusted-person/verify/{token}"
        );
    }

    #[test]
    fn normalize_path_leaves_static_paths_alone() {
        assert_eq!(normalize_path("/checkin/status"), "/checkin/status");
        assert_eq!(normalize_path("/legacy/recipient"), "/legacy/recipient");
    }

    #[test]
    fn record_request_counts_errors_separately() {
        let metrics = ApiMetrics::new();
        metrics.record_request("GET", "/checkin/status", 200, 0.01);
        metrics.record_request("GET", "/checkin/status", 404, 0.01);

        let encoded = metrics.gather_and_encode();
        assert!(encoded.contains("vigil_http_requests_total"));
        assert!(encoded.contains("vigil_http_errors_total"));
        assert!(encoded.contains("status=\"404\""));
    }

    #[test]
    fn gather_includes_domain_gauges() {
        let metrics = ApiMetrics::new();
        let encoded = metrics.gather_and_encode();
        assert!(encoded.contains("vigil_users_total"));
        assert!(encoded.contains("vigil_vault_items_total"));
    }
}
