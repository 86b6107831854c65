//! Prometheus metrics for bridge-service

pub mod context_cache;
pub mod recommendations;

use actix_web::HttpResponse;
use prometheus::{Encoder, TextEncoder};

/// GET /metrics
pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", err);
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
