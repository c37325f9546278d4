//! System handlers: health and metrics.

use crate::admin_api::types::*;
use crate::emulator::Emulator;
use crate::metrics::{collect_metrics, set_active_rules};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// GET /health - Health check
pub fn handle_health(emulator: &Emulator) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            active_rules: emulator.active_rules(),
        },
    )
}

/// GET /metrics - Prometheus metrics
pub fn handle_metrics(emulator: &Emulator) -> Response<Full<Bytes>> {
    set_active_rules(emulator.active_rules());
    build_response_with_headers(
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        collect_metrics(),
    )
}
