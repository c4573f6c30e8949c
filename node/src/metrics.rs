//! # Prometheus Metrics
//!
//! Operational counters for the offer / sign workflow. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] under
//! the `paysign` namespace so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Offers persisted as Pending.
    pub offers_created_total: IntCounter,
    /// Transactions that reached Completed.
    pub completions_total: IntCounter,
    /// Transactions this node saw reach Failed: explicit fails, and sign
    /// attempts (refused or broken) after which the record is Failed.
    pub failures_total: IntCounter,
    /// Completion attempts refused because the signature did not verify or
    /// the sender had no usable key.
    pub signature_rejections_total: IntCounter,
    /// Wall-clock latency of `sign_and_complete` in seconds.
    pub sign_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("paysign".into()), None)?;

        let offers_created_total =
            IntCounter::new("offers_created_total", "Total number of offers created")?;
        registry.register(Box::new(offers_created_total.clone()))?;

        let completions_total = IntCounter::new(
            "completions_total",
            "Total number of transactions completed with a verified signature",
        )?;
        registry.register(Box::new(completions_total.clone()))?;

        let failures_total =
            IntCounter::new("failures_total", "Total number of transactions marked failed")?;
        registry.register(Box::new(failures_total.clone()))?;

        let signature_rejections_total = IntCounter::new(
            "signature_rejections_total",
            "Total number of completion attempts rejected at signature verification",
        )?;
        registry.register(Box::new(signature_rejections_total.clone()))?;

        let sign_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "sign_latency_seconds",
                "Latency of sign-and-complete requests in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(sign_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            offers_created_total,
            completions_total,
            failures_total,
            signature_rejections_total,
            sign_latency_seconds,
        })
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics handle passed to axum handlers via state.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_are_namespaced() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.offers_created_total.inc();
        metrics.sign_latency_seconds.observe(0.002);

        let text = metrics.encode().unwrap();
        assert!(text.contains("paysign_offers_created_total 1"));
        assert!(text.contains("paysign_completions_total 0"));
        assert!(text.contains("paysign_sign_latency_seconds_count 1"));
    }

    #[test]
    fn registries_are_independent() {
        let a = NodeMetrics::new().unwrap();
        let b = NodeMetrics::new().unwrap();
        a.failures_total.inc();
        assert_eq!(a.failures_total.get(), 1);
        assert_eq!(b.failures_total.get(), 0);
    }
}
