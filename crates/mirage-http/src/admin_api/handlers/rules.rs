//! Rule registration and reset handlers.

use crate::admin_api::types::{build_response, collect_body, error_response};
use crate::emulator::{Emulator, ResponseRule};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use std::fmt::Display;
use tracing::{info, warn};

/// POST /presetResponse - Register a response rule
pub async fn handle_preset_response<B>(req: Request<B>, emulator: &Emulator) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };

    let rule: ResponseRule = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Rejected preset response document: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid response rule JSON: {e}"),
            );
        }
    };

    info!(
        "Emulator request received from test client to preset a {} response",
        rule.predicate.request_type
    );

    match emulator.register(rule) {
        Ok(()) => build_response(StatusCode::OK, Bytes::new()),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

/// DELETE /reset - Clear transient rules and request history
pub fn handle_reset(emulator: &Emulator) -> Response<Full<Bytes>> {
    info!("Emulator request received from test client to reset the emulator");
    emulator.reset();
    build_response(StatusCode::OK, Bytes::new())
}
